use serde::{Deserialize, Serialize};

/// Score at or above which a transaction is flagged as fraud.
pub const FRAUD_THRESHOLD: f64 = 70.0;
pub const MAX_RISK_SCORE: f64 = 100.0;
pub const MAX_CONFIDENCE: f64 = 0.95;
pub const CONFIDENCE_PER_FACTOR: f64 = 0.08;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    /// Maps a score onto its band: `[70, 100]` critical, `[50, 70)` high,
    /// `[30, 50)` medium, everything below low.
    pub fn from_score(score: f64) -> Self {
        if score >= 70.0 {
            RiskLevel::Critical
        } else if score >= 50.0 {
            RiskLevel::High
        } else if score >= 30.0 {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
            RiskLevel::Critical => "critical",
        }
    }
}

/// Outcome of scoring a single transaction.
///
/// Only the score, factors and confidence are inputs; the level and the
/// fraud flags are derived in [`RiskAssessment::new`] and cannot drift.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub risk_score: f64,
    pub risk_level: RiskLevel,
    pub risk_factors: Vec<String>,
    pub confidence: f64,
    pub is_fraud: bool,
    pub fraud_prob: f64,
}

impl RiskAssessment {
    pub fn new(risk_score: f64, risk_factors: Vec<String>, confidence: f64) -> Self {
        let risk_score = risk_score.clamp(0.0, MAX_RISK_SCORE);
        Self {
            risk_score,
            risk_level: RiskLevel::from_score(risk_score),
            risk_factors,
            confidence: confidence.clamp(0.0, 1.0),
            is_fraud: risk_score >= FRAUD_THRESHOLD,
            fraud_prob: risk_score / MAX_RISK_SCORE,
        }
    }
}
