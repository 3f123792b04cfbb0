use super::authorization::DecisionRecord;
use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Durable sink for authorization decisions.
#[async_trait]
pub trait TransactionStore: Send + Sync {
    async fn save(&self, record: &DecisionRecord) -> Result<()>;
    async fn all(&self) -> Result<Vec<DecisionRecord>>;
}

pub type TransactionStoreBox = Box<dyn TransactionStore>;

/// Source of "now" for velocity windows and token expiry.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub type SharedClock = Arc<dyn Clock>;
