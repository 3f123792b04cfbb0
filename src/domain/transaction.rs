use crate::error::AuthError;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A strictly positive purchase amount.
///
/// Wraps `rust_decimal::Decimal` so that a transaction can never reach the
/// risk engine with a zero or negative amount: the check happens at
/// construction and during deserialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Amount(Decimal);

impl Amount {
    pub fn new(value: Decimal) -> Result<Self, AuthError> {
        if value > Decimal::ZERO {
            Ok(Self(value.normalize()))
        } else {
            Err(AuthError::ValidationError(
                "Amount must be positive".to_string(),
            ))
        }
    }

    pub fn value(&self) -> Decimal {
        self.0
    }
}

impl TryFrom<Decimal> for Amount {
    type Error = AuthError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Amount> for Decimal {
    fn from(amount: Amount) -> Self {
        amount.0
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// A proposed purchase submitted for authorization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub transaction_id: String,
    pub customer_id: String,
    pub merchant_id: String,
    pub amount: Amount,
    #[serde(default)]
    pub billing_zip: Option<String>,
    #[serde(default)]
    pub shipping_zip: Option<String>,
    #[serde(default)]
    pub device_fingerprint: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl Transaction {
    /// Builds a transaction with no address or device data.
    pub fn new(
        transaction_id: impl Into<String>,
        customer_id: impl Into<String>,
        merchant_id: impl Into<String>,
        amount: Amount,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            transaction_id: transaction_id.into(),
            customer_id: customer_id.into(),
            merchant_id: merchant_id.into(),
            amount,
            billing_zip: None,
            shipping_zip: None,
            device_fingerprint: None,
            timestamp,
        }
    }

    pub fn with_zips(mut self, billing: impl Into<String>, shipping: impl Into<String>) -> Self {
        self.billing_zip = Some(billing.into());
        self.shipping_zip = Some(shipping.into());
        self
    }

    pub fn with_device(mut self, fingerprint: impl Into<String>) -> Self {
        self.device_fingerprint = Some(fingerprint.into());
        self
    }

    /// Billing and shipping postal codes, only when both are present and non-empty.
    pub fn postal_codes(&self) -> Option<(&str, &str)> {
        match (non_empty(&self.billing_zip), non_empty(&self.shipping_zip)) {
            (Some(billing), Some(shipping)) => Some((billing, shipping)),
            _ => None,
        }
    }

    pub fn device(&self) -> Option<&str> {
        non_empty(&self.device_fingerprint)
    }

    /// Rejects transactions missing the identifiers the engines key on.
    pub fn validate(&self) -> Result<(), AuthError> {
        for (field, value) in [
            ("transaction_id", &self.transaction_id),
            ("customer_id", &self.customer_id),
            ("merchant_id", &self.merchant_id),
        ] {
            if value.trim().is_empty() {
                return Err(AuthError::ValidationError(format!("{field} must not be empty")));
            }
        }
        Ok(())
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}
