use crate::config::EngineConfig;
use crate::domain::ports::SharedClock;
use crate::domain::risk::{CONFIDENCE_PER_FACTOR, MAX_CONFIDENCE, RiskAssessment};
use crate::domain::transaction::Transaction;
use chrono::{DateTime, Duration, Timelike, Utc};
use dashmap::DashMap;
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::{HashSet, VecDeque};
use tracing::debug;

const AMOUNT_FACTOR_THRESHOLD: f64 = 15.0;
const VELOCITY_FACTOR_THRESHOLD: f64 = 10.0;
const GEO_FACTOR_THRESHOLD: f64 = 10.0;
const DEVICE_FACTOR_THRESHOLD: f64 = 15.0;
const TIME_FACTOR_THRESHOLD: f64 = 10.0;

/// Share of unseen devices treated as suspicious. Stands in for a real
/// device reputation lookup.
const SUSPICIOUS_NEW_DEVICE_PROBABILITY: f64 = 0.3;

/// Recent transaction times for one customer, oldest first.
#[derive(Debug, Default)]
struct VelocityWindow {
    timestamps: VecDeque<DateTime<Utc>>,
}

impl VelocityWindow {
    fn prune(&mut self, now: DateTime<Utc>, window: Duration) {
        while let Some(oldest) = self.timestamps.front() {
            if now - *oldest >= window {
                self.timestamps.pop_front();
            } else {
                break;
            }
        }
    }

    /// Prunes, counts what is left, then records `now`.
    fn observe(&mut self, now: DateTime<Utc>, window: Duration) -> usize {
        self.prune(now, window);
        let count = self.timestamps.len();
        self.timestamps.push_back(now);
        count
    }
}

#[derive(Debug, Default)]
struct CustomerActivity {
    velocity: VelocityWindow,
    known_devices: HashSet<String>,
}

/// Rule-based scorer combining five additive signals into a 0-100 score.
///
/// Velocity and device history are kept per customer. Both are read and
/// updated under the same map entry, so concurrent scoring for one customer
/// sees a serial history.
pub struct RiskEngine {
    activity: DashMap<String, CustomerActivity>,
    rng: Mutex<StdRng>,
    clock: SharedClock,
    confidence_base: f64,
    velocity_window: Duration,
}

impl RiskEngine {
    pub fn new(config: &EngineConfig, clock: SharedClock) -> Self {
        let rng = match config.device_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            activity: DashMap::new(),
            rng: Mutex::new(rng),
            clock,
            confidence_base: config.confidence_base,
            velocity_window: config.velocity_window(),
        }
    }

    /// Replaces the random source behind the new-device roll.
    pub fn with_rng(mut self, rng: StdRng) -> Self {
        self.rng = Mutex::new(rng);
        self
    }

    /// Scores a transaction, recording it in the customer's velocity window
    /// and adding its device to the customer's known devices.
    pub fn calculate_risk_score(&self, tx: &Transaction) -> RiskAssessment {
        let now = self.clock.now();
        let mut factors = Vec::new();
        let mut score = 0.0;

        let amount = amount_risk(tx.amount.value());
        score += amount;
        if amount > AMOUNT_FACTOR_THRESHOLD {
            factors.push(format!(
                "High transaction amount: ${:.2}",
                tx.amount.value()
            ));
        }

        let (velocity, device) = {
            let mut activity = self.activity.entry(tx.customer_id.clone()).or_default();
            let recent = activity.velocity.observe(now, self.velocity_window);
            let device = tx
                .device()
                .map(|fingerprint| self.device_risk(&mut activity.known_devices, fingerprint));
            (velocity_risk(recent), device)
        };

        score += velocity;
        if velocity > VELOCITY_FACTOR_THRESHOLD {
            factors.push("Multiple transactions in short timeframe".to_string());
        }

        if let Some((billing, shipping)) = tx.postal_codes() {
            let geo = geo_risk(billing, shipping);
            score += geo;
            if geo > GEO_FACTOR_THRESHOLD {
                factors.push("Billing and shipping address mismatch".to_string());
            }
        }

        if let Some(device) = device {
            score += device;
            if device > DEVICE_FACTOR_THRESHOLD {
                factors.push("Transaction from new or suspicious device".to_string());
            }
        }

        let time = time_of_day_risk(tx.timestamp.hour());
        score += time;
        if time > TIME_FACTOR_THRESHOLD {
            factors.push("Transaction at unusual time".to_string());
        }

        let confidence = self.confidence(factors.len());
        let assessment = RiskAssessment::new(score, factors, confidence);
        debug!(
            customer_id = %tx.customer_id,
            transaction_id = %tx.transaction_id,
            risk_score = assessment.risk_score,
            risk_level = assessment.risk_level.as_str(),
            "scored transaction"
        );
        assessment
    }

    /// Transactions recorded for the customer inside the trailing window.
    pub fn velocity_count(&self, customer_id: &str) -> usize {
        let now = self.clock.now();
        self.activity
            .get_mut(customer_id)
            .map(|mut activity| {
                activity.velocity.prune(now, self.velocity_window);
                activity.velocity.timestamps.len()
            })
            .unwrap_or(0)
    }

    pub fn is_known_device(&self, customer_id: &str, fingerprint: &str) -> bool {
        self.activity
            .get(customer_id)
            .is_some_and(|activity| activity.known_devices.contains(fingerprint))
    }

    fn device_risk(&self, known: &mut HashSet<String>, fingerprint: &str) -> f64 {
        if known.contains(fingerprint) {
            return 0.0;
        }
        known.insert(fingerprint.to_string());

        if self.rng.lock().gen_bool(SUSPICIOUS_NEW_DEVICE_PROBABILITY) {
            20.0
        } else {
            10.0
        }
    }

    fn confidence(&self, reported_factors: usize) -> f64 {
        (self.confidence_base + CONFIDENCE_PER_FACTOR * reported_factors as f64).min(MAX_CONFIDENCE)
    }
}

/// Tiered contribution of the purchase amount.
pub fn amount_risk(amount: Decimal) -> f64 {
    if amount < dec!(50) {
        5.0
    } else if amount < dec!(200) {
        10.0
    } else if amount < dec!(500) {
        20.0
    } else if amount < dec!(1000) {
        30.0
    } else {
        40.0
    }
}

/// Contribution of the number of prior transactions in the trailing window.
pub fn velocity_risk(recent: usize) -> f64 {
    match recent {
        n if n >= 5 => 35.0,
        n if n >= 3 => 20.0,
        2 => 10.0,
        _ => 0.0,
    }
}

/// Postal codes whose first three characters differ are likely far apart.
pub fn geo_risk(billing: &str, shipping: &str) -> f64 {
    let prefix = |zip: &str| zip.chars().take(3).collect::<String>();
    if prefix(billing) != prefix(shipping) {
        15.0
    } else {
        0.0
    }
}

/// 2-6 AM is the most suspicious stretch; 11 PM-2 AM and 7 AM mildly so.
pub fn time_of_day_risk(hour: u32) -> f64 {
    match hour {
        2..=6 => 15.0,
        0 | 1 | 7 | 23 => 5.0,
        _ => 0.0,
    }
}
