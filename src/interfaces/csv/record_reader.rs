use crate::domain::transaction::{Amount, Transaction};
use crate::error::{AuthError, Result};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::io::Read;
use uuid::Uuid;

#[derive(Debug, Deserialize, PartialEq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum Command {
    Preverify,
    Authorize,
}

/// One input row: either a pre-verification request or a purchase to
/// authorize.
#[derive(Debug, Deserialize, PartialEq, Clone)]
pub struct InputRecord {
    pub command: Command,
    #[serde(default)]
    pub transaction_id: Option<String>,
    pub customer_id: String,
    #[serde(default)]
    pub merchant_id: Option<String>,
    pub amount: Amount,
    #[serde(default)]
    pub billing_zip: Option<String>,
    #[serde(default)]
    pub shipping_zip: Option<String>,
    #[serde(default)]
    pub device_fingerprint: Option<String>,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
    /// How a `preverify` row's customer was verified. Ignored on `authorize`.
    #[serde(default)]
    pub verification_method: Option<String>,
}

impl InputRecord {
    /// Builds the transaction for an `authorize` row.
    ///
    /// A missing id gets a generated one and a missing timestamp becomes
    /// `now`. The merchant is required.
    pub fn into_transaction(self, now: DateTime<Utc>) -> Result<Transaction> {
        let merchant_id = self
            .merchant_id
            .filter(|m| !m.is_empty())
            .ok_or_else(|| AuthError::ValidationError("merchant_id is required".to_string()))?;

        Ok(Transaction {
            transaction_id: self
                .transaction_id
                .filter(|id| !id.is_empty())
                .unwrap_or_else(|| Uuid::new_v4().to_string()),
            customer_id: self.customer_id,
            merchant_id,
            amount: self.amount,
            billing_zip: self.billing_zip,
            shipping_zip: self.shipping_zip,
            device_fingerprint: self.device_fingerprint,
            timestamp: self.timestamp.unwrap_or(now),
        })
    }
}

/// Reads pre-verification and authorization requests from a CSV source.
///
/// Whitespace is trimmed and short records are accepted, so trailing
/// optional columns may be left out.
pub struct RecordReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> RecordReader<R> {
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    /// Lazily deserializes records; a malformed row yields an error and the
    /// stream continues.
    pub fn records(self) -> impl Iterator<Item = Result<InputRecord>> {
        self.reader
            .into_deserialize()
            .map(|result| result.map_err(AuthError::from))
    }
}
