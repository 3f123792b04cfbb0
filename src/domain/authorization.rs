use super::risk::{FRAUD_THRESHOLD, RiskAssessment};
use super::transaction::Transaction;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    Approved,
    Declined,
    PreVerified,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Approved => "approved",
            TransactionStatus::Declined => "declined",
            TransactionStatus::PreVerified => "pre_verified",
        }
    }
}

/// Token handed back to the caller after a successful pre-verification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreVerificationResponse {
    pub verification_token: String,
    pub expires_at: DateTime<Utc>,
    pub verified: bool,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthorizationResponse {
    pub transaction_id: String,
    pub status: TransactionStatus,
    pub approved: bool,
    pub risk_assessment: RiskAssessment,
    pub message: String,
    pub processing_time_ms: f64,
    /// Amount kept by approving a would-be decline through pre-verification.
    pub revenue_saved: Decimal,
}

/// One authorization decision as kept in history and handed to storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionRecord {
    pub transaction: Transaction,
    pub response: AuthorizationResponse,
    pub pre_verified: bool,
    pub recorded_at: DateTime<Utc>,
}

/// Per-merchant aggregate over a window of decisions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MerchantAnalytics {
    pub merchant_id: String,
    pub period_start: DateTime<Utc>,
    pub period_end: DateTime<Utc>,
    pub total_transactions: usize,
    pub total_approved: usize,
    pub total_declined: usize,
    pub total_pre_verified: usize,
    /// Declines whose score reached the fraud threshold.
    pub fraud_prevented_count: usize,
    pub revenue_saved: Decimal,
    /// Percentage of transactions approved outright or via pre-verification.
    pub approval_rate: f64,
    pub avg_risk_score: f64,
}

impl MerchantAnalytics {
    /// Aggregates the records of `merchant_id` whose transaction timestamp
    /// falls within `[start, end]`. Returns `None` when nothing matches.
    pub fn aggregate<'a>(
        merchant_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        records: impl IntoIterator<Item = &'a DecisionRecord>,
    ) -> Option<Self> {
        let mut analytics = Self {
            merchant_id: merchant_id.to_string(),
            period_start: start,
            period_end: end,
            total_transactions: 0,
            total_approved: 0,
            total_declined: 0,
            total_pre_verified: 0,
            fraud_prevented_count: 0,
            revenue_saved: Decimal::ZERO,
            approval_rate: 0.0,
            avg_risk_score: 0.0,
        };
        let mut score_sum = 0.0;

        for record in records {
            let tx = &record.transaction;
            if tx.merchant_id != merchant_id || tx.timestamp < start || tx.timestamp > end {
                continue;
            }

            let response = &record.response;
            analytics.total_transactions += 1;
            match response.status {
                TransactionStatus::Approved => analytics.total_approved += 1,
                TransactionStatus::PreVerified => analytics.total_pre_verified += 1,
                TransactionStatus::Declined => {
                    analytics.total_declined += 1;
                    if response.risk_assessment.risk_score >= FRAUD_THRESHOLD {
                        analytics.fraud_prevented_count += 1;
                    }
                }
            }
            analytics.revenue_saved += response.revenue_saved;
            score_sum += response.risk_assessment.risk_score;
        }

        if analytics.total_transactions == 0 {
            return None;
        }

        let total = analytics.total_transactions as f64;
        let approved = (analytics.total_approved + analytics.total_pre_verified) as f64;
        analytics.approval_rate = approved / total * 100.0;
        analytics.avg_risk_score = score_sum / total;
        Some(analytics)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::transaction::Amount;
    use chrono::{Duration, TimeZone};
    use rust_decimal_macros::dec;

    fn record(
        merchant: &str,
        at: DateTime<Utc>,
        status: TransactionStatus,
        score: f64,
        saved: Decimal,
    ) -> DecisionRecord {
        let tx = Transaction::new("txn", "cust_1", merchant, Amount::new(dec!(100)).unwrap(), at);
        DecisionRecord {
            response: AuthorizationResponse {
                transaction_id: tx.transaction_id.clone(),
                status,
                approved: status != TransactionStatus::Declined,
                risk_assessment: RiskAssessment::new(score, vec![], 0.5),
                message: String::new(),
                processing_time_ms: 0.1,
                revenue_saved: saved,
            },
            transaction: tx,
            pre_verified: status == TransactionStatus::PreVerified,
            recorded_at: at,
        }
    }

    #[test]
    fn test_aggregate_counts_and_rates() {
        let t0 = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        let records = vec![
            record("m1", t0, TransactionStatus::Approved, 20.0, dec!(0)),
            record("m1", t0, TransactionStatus::PreVerified, 60.0, dec!(500)),
            record("m1", t0, TransactionStatus::Declined, 80.0, dec!(0)),
            record("m1", t0, TransactionStatus::Declined, 55.0, dec!(0)),
            record("m2", t0, TransactionStatus::Approved, 10.0, dec!(0)),
        ];

        let analytics =
            MerchantAnalytics::aggregate("m1", t0, t0 + Duration::hours(1), &records).unwrap();

        assert_eq!(analytics.total_transactions, 4);
        assert_eq!(analytics.total_approved, 1);
        assert_eq!(analytics.total_pre_verified, 1);
        assert_eq!(analytics.total_declined, 2);
        assert_eq!(analytics.fraud_prevented_count, 1);
        assert_eq!(analytics.revenue_saved, dec!(500));
        assert!((analytics.approval_rate - 50.0).abs() < 1e-9);
        assert!((analytics.avg_risk_score - 53.75).abs() < 1e-9);
    }

    #[test]
    fn test_aggregate_window_is_inclusive() {
        let t0 = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        let t1 = t0 + Duration::hours(2);
        let records = vec![
            record("m1", t0, TransactionStatus::Approved, 20.0, dec!(0)),
            record("m1", t1, TransactionStatus::Approved, 20.0, dec!(0)),
            record("m1", t1 + Duration::seconds(1), TransactionStatus::Approved, 20.0, dec!(0)),
        ];

        let analytics = MerchantAnalytics::aggregate("m1", t0, t1, &records).unwrap();
        assert_eq!(analytics.total_transactions, 2);
    }

    #[test]
    fn test_aggregate_empty_is_none() {
        let t0 = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        let records = vec![record("m2", t0, TransactionStatus::Approved, 20.0, dec!(0))];
        assert!(MerchantAnalytics::aggregate("m1", t0, t0, &records).is_none());
        assert!(MerchantAnalytics::aggregate("m1", t0, t0, &Vec::new()).is_none());
    }

    #[test]
    fn test_status_serializes_snake_case() {
        let json = serde_json::to_string(&TransactionStatus::PreVerified).unwrap();
        assert_eq!(json, "\"pre_verified\"");
    }
}
