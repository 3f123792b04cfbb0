use crate::domain::authorization::DecisionRecord;
use crate::domain::ports::TransactionStore;
use crate::error::{AuthError, Result};
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Default)]
struct Decisions {
    ids: HashSet<String>,
    records: Vec<DecisionRecord>,
}

/// A thread-safe in-memory store for authorization decisions.
///
/// Records keep their insertion order. A transaction id can only be saved
/// once; a second save for the same id is rejected.
#[derive(Default, Clone)]
pub struct InMemoryTransactionStore {
    decisions: Arc<RwLock<Decisions>>,
}

impl InMemoryTransactionStore {
    /// Creates a new, empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TransactionStore for InMemoryTransactionStore {
    async fn save(&self, record: &DecisionRecord) -> Result<()> {
        let mut decisions = self.decisions.write().await;
        let id = &record.transaction.transaction_id;
        if !decisions.ids.insert(id.clone()) {
            return Err(AuthError::StorageError(format!(
                "transaction {id} already recorded"
            )));
        }
        decisions.records.push(record.clone());
        Ok(())
    }

    async fn all(&self) -> Result<Vec<DecisionRecord>> {
        let decisions = self.decisions.read().await;
        Ok(decisions.records.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::authorization::{AuthorizationResponse, TransactionStatus};
    use crate::domain::risk::RiskAssessment;
    use crate::domain::transaction::{Amount, Transaction};
    use chrono::Utc;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn record(id: &str) -> DecisionRecord {
        let tx = Transaction::new(id, "cust_1", "merch_1", Amount::new(dec!(10)).unwrap(), Utc::now());
        DecisionRecord {
            response: AuthorizationResponse {
                transaction_id: id.to_string(),
                status: TransactionStatus::Approved,
                approved: true,
                risk_assessment: RiskAssessment::new(5.0, vec![], 0.5),
                message: "ok".to_string(),
                processing_time_ms: 0.0,
                revenue_saved: Decimal::ZERO,
            },
            transaction: tx,
            pre_verified: false,
            recorded_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_in_memory_store_keeps_order() {
        let store = InMemoryTransactionStore::new();
        store.save(&record("a")).await.unwrap();
        store.save(&record("b")).await.unwrap();

        let all = store.all().await.unwrap();
        let ids: Vec<_> = all.iter().map(|r| r.transaction.transaction_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_in_memory_store_rejects_duplicate_id() {
        let store = InMemoryTransactionStore::new();
        store.save(&record("a")).await.unwrap();

        let err = store.save(&record("a")).await.unwrap_err();
        assert!(matches!(err, AuthError::StorageError(_)));
        assert_eq!(store.all().await.unwrap().len(), 1);
    }
}
