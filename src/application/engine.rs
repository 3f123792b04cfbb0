use super::risk_engine::RiskEngine;
use crate::config::EngineConfig;
use crate::domain::authorization::{
    AuthorizationResponse, DecisionRecord, MerchantAnalytics, PreVerificationResponse,
    TransactionStatus,
};
use crate::domain::ports::{SharedClock, TransactionStoreBox};
use crate::domain::risk::RiskAssessment;
use crate::domain::transaction::{Amount, Transaction};
use crate::error::Result;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use rust_decimal::Decimal;
use std::collections::VecDeque;
use std::time::Instant;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Pre-verifications are scoped to a customer and an exact amount.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct VerificationKey {
    customer_id: String,
    amount: Amount,
}

#[derive(Debug, Clone)]
struct PreVerificationRecord {
    token: String,
    expires_at: DateTime<Utc>,
}

/// Result of an authorization whose decision was computed.
///
/// `Unrecorded` means the decision stands but the store rejected it, so it
/// is not durably recorded.
#[derive(Debug, Clone, PartialEq)]
pub enum AuthorizationOutcome {
    Recorded(AuthorizationResponse),
    Unrecorded {
        response: AuthorizationResponse,
        reason: String,
    },
}

impl AuthorizationOutcome {
    pub fn response(&self) -> &AuthorizationResponse {
        match self {
            AuthorizationOutcome::Recorded(response) => response,
            AuthorizationOutcome::Unrecorded { response, .. } => response,
        }
    }

    pub fn into_response(self) -> AuthorizationResponse {
        match self {
            AuthorizationOutcome::Recorded(response) => response,
            AuthorizationOutcome::Unrecorded { response, .. } => response,
        }
    }

    pub fn is_recorded(&self) -> bool {
        matches!(self, AuthorizationOutcome::Recorded(_))
    }
}

/// Entry point for pre-verification and authorization decisions.
///
/// Owns the risk engine, the outstanding pre-verification tokens and a
/// bounded history of decisions used for analytics. Every decision is also
/// handed to the configured store.
pub struct AuthorizationEngine {
    risk_engine: RiskEngine,
    store: TransactionStoreBox,
    clock: SharedClock,
    verifications: DashMap<VerificationKey, PreVerificationRecord>,
    history: RwLock<VecDeque<DecisionRecord>>,
    decision_threshold: f64,
    token_ttl: Duration,
    history_capacity: usize,
}

impl AuthorizationEngine {
    /// Creates an engine with its own risk engine built from `config`.
    pub fn new(config: &EngineConfig, store: TransactionStoreBox, clock: SharedClock) -> Self {
        let risk_engine = RiskEngine::new(config, clock.clone());
        Self::with_risk_engine(config, risk_engine, store, clock)
    }

    pub fn with_risk_engine(
        config: &EngineConfig,
        risk_engine: RiskEngine,
        store: TransactionStoreBox,
        clock: SharedClock,
    ) -> Self {
        Self {
            risk_engine,
            store,
            clock,
            verifications: DashMap::new(),
            history: RwLock::new(VecDeque::new()),
            decision_threshold: config.decision_threshold,
            token_ttl: config.token_ttl(),
            history_capacity: config.history_capacity,
        }
    }

    pub fn risk_engine(&self) -> &RiskEngine {
        &self.risk_engine
    }

    /// Issues a fresh token for `(customer_id, amount)`, replacing any token
    /// previously issued for the same pair.
    pub fn pre_verify_transaction(&self, customer_id: &str, amount: Amount) -> PreVerificationResponse {
        self.pre_verify_with_method(customer_id, amount, None)
    }

    /// Like [`Self::pre_verify_transaction`], naming how the customer was
    /// verified (`sms`, `email`, `biometric`). The method is echoed in the
    /// response message; it does not change the token's scope.
    pub fn pre_verify_with_method(
        &self,
        customer_id: &str,
        amount: Amount,
        method: Option<&str>,
    ) -> PreVerificationResponse {
        let now = self.clock.now();
        self.sweep_expired(now);

        let record = PreVerificationRecord {
            token: Uuid::new_v4().to_string(),
            expires_at: now
                .checked_add_signed(self.token_ttl)
                .unwrap_or(DateTime::<Utc>::MAX_UTC),
        };
        let key = VerificationKey {
            customer_id: customer_id.to_string(),
            amount,
        };
        if self.verifications.insert(key, record.clone()).is_some() {
            debug!(customer_id, %amount, "replaced pending pre-verification");
        }

        let message = match method.map(str::trim).filter(|m| !m.is_empty()) {
            Some(method) => {
                debug!(customer_id, %amount, method, "pre-verified");
                format!("Pre-verification successful via {method}.")
            }
            None => "Pre-verification successful.".to_string(),
        };

        PreVerificationResponse {
            verification_token: record.token,
            expires_at: record.expires_at,
            verified: true,
            message,
        }
    }

    /// Scores `tx` and decides it.
    ///
    /// A score below the decision threshold is approved outright. Otherwise a
    /// valid token for the transaction's customer and amount turns the
    /// decline into a pre-verified approval. The decision is added to the
    /// history before it is handed to the store.
    pub async fn authorize_transaction(
        &self,
        tx: Transaction,
        verification_token: Option<&str>,
    ) -> Result<AuthorizationOutcome> {
        tx.validate()?;
        let started = Instant::now();

        let assessment = self.risk_engine.calculate_risk_score(&tx);
        let pre_verified = self.check_pre_verification(&tx.customer_id, tx.amount, verification_token);
        let (status, message, revenue_saved) = self.decide(&assessment, pre_verified, tx.amount);

        let response = AuthorizationResponse {
            transaction_id: tx.transaction_id.clone(),
            status,
            approved: status != TransactionStatus::Declined,
            risk_assessment: assessment,
            message,
            processing_time_ms: started.elapsed().as_secs_f64() * 1000.0,
            revenue_saved,
        };

        info!(
            transaction_id = %tx.transaction_id,
            customer_id = %tx.customer_id,
            status = status.as_str(),
            risk_score = response.risk_assessment.risk_score,
            "authorization decided"
        );

        let record = DecisionRecord {
            transaction: tx,
            response: response.clone(),
            pre_verified,
            recorded_at: self.clock.now(),
        };
        self.remember(record.clone()).await;

        match self.store.save(&record).await {
            Ok(()) => Ok(AuthorizationOutcome::Recorded(response)),
            Err(e) => {
                warn!(transaction_id = %response.transaction_id, error = %e, "decision not persisted");
                Ok(AuthorizationOutcome::Unrecorded {
                    response,
                    reason: e.to_string(),
                })
            }
        }
    }

    /// Aggregates in-memory decisions for a merchant whose transaction
    /// timestamps fall within `[start, end]`.
    pub async fn merchant_analytics(
        &self,
        merchant_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Option<MerchantAnalytics> {
        let history = self.history.read().await;
        MerchantAnalytics::aggregate(merchant_id, start, end, history.iter())
    }

    /// The last `limit` decisions, oldest first and most recent last.
    pub async fn transaction_history(&self, limit: usize) -> Vec<DecisionRecord> {
        let history = self.history.read().await;
        let skip = history.len().saturating_sub(limit);
        history.iter().skip(skip).cloned().collect()
    }

    /// Drops pre-verifications past their expiry and returns how many went.
    pub fn evict_expired_verifications(&self) -> usize {
        self.sweep_expired(self.clock.now())
    }

    pub fn pending_verifications(&self) -> usize {
        self.verifications.len()
    }

    fn sweep_expired(&self, now: DateTime<Utc>) -> usize {
        let before = self.verifications.len();
        self.verifications.retain(|_, record| now <= record.expires_at);
        before.saturating_sub(self.verifications.len())
    }

    fn check_pre_verification(&self, customer_id: &str, amount: Amount, token: Option<&str>) -> bool {
        let Some(token) = token.filter(|t| !t.is_empty()) else {
            return false;
        };
        let key = VerificationKey {
            customer_id: customer_id.to_string(),
            amount,
        };
        let Some(record) = self.verifications.get(&key) else {
            return false;
        };

        record.token == token && self.clock.now() <= record.expires_at
    }

    fn decide(
        &self,
        assessment: &RiskAssessment,
        pre_verified: bool,
        amount: Amount,
    ) -> (TransactionStatus, String, Decimal) {
        let score = assessment.risk_score;
        if score < self.decision_threshold {
            (
                TransactionStatus::Approved,
                "Transaction approved - Low risk".to_string(),
                Decimal::ZERO,
            )
        } else if pre_verified {
            (
                TransactionStatus::PreVerified,
                "Transaction approved via pre-verification.".to_string(),
                amount.value(),
            )
        } else {
            (
                TransactionStatus::Declined,
                format!("Transaction declined - High risk ({score:.1}/100)."),
                Decimal::ZERO,
            )
        }
    }

    async fn remember(&self, record: DecisionRecord) {
        let mut history = self.history.write().await;
        history.push_back(record);
        while history.len() > self.history_capacity {
            history.pop_front();
        }
    }
}
