use crate::error::{AuthError, Result};
use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Upper bound for the token TTL and the velocity window: one year.
pub const MAX_WINDOW_MINUTES: i64 = 365 * 24 * 60;

/// Tunables for the risk and authorization engines.
///
/// Every field has a default, so a TOML file only needs to name the values
/// it overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Confidence before any factor is reported. Deployments have run with
    /// both 0.5 and 0.6.
    pub confidence_base: f64,
    /// Scores strictly below this are approved unconditionally.
    pub decision_threshold: f64,
    pub token_ttl_minutes: i64,
    pub velocity_window_minutes: i64,
    /// Number of decisions kept in the in-memory history.
    pub history_capacity: usize,
    /// Seed for the new-device reputation roll. Entropy when absent.
    pub device_seed: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            confidence_base: 0.5,
            decision_threshold: 50.0,
            token_ttl_minutes: 15,
            velocity_window_minutes: 60,
            history_capacity: 10_000,
            device_seed: None,
        }
    }
}

impl EngineConfig {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects values that would overflow time arithmetic or quietly
    /// disable a scoring rule.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.confidence_base) {
            return Err(invalid("confidence_base must be within [0, 1]"));
        }
        if !(0.0..=100.0).contains(&self.decision_threshold) {
            return Err(invalid("decision_threshold must be within [0, 100]"));
        }
        if !(1..=MAX_WINDOW_MINUTES).contains(&self.token_ttl_minutes) {
            return Err(invalid(&format!(
                "token_ttl_minutes must be within [1, {MAX_WINDOW_MINUTES}]"
            )));
        }
        if !(1..=MAX_WINDOW_MINUTES).contains(&self.velocity_window_minutes) {
            return Err(invalid(&format!(
                "velocity_window_minutes must be within [1, {MAX_WINDOW_MINUTES}]"
            )));
        }
        if self.history_capacity == 0 {
            return Err(invalid("history_capacity must be at least 1"));
        }
        Ok(())
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    pub fn token_ttl(&self) -> Duration {
        Duration::minutes(self.token_ttl_minutes)
    }

    pub fn velocity_window(&self) -> Duration {
        Duration::minutes(self.velocity_window_minutes)
    }
}

fn invalid(message: &str) -> AuthError {
    AuthError::ValidationError(message.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = EngineConfig::from_toml_str("confidence_base = 0.6\ndevice_seed = 7").unwrap();
        assert_eq!(config.confidence_base, 0.6);
        assert_eq!(config.device_seed, Some(7));
        assert_eq!(config.decision_threshold, 50.0);
        assert_eq!(config.token_ttl(), Duration::minutes(15));
        assert_eq!(config.velocity_window(), Duration::hours(1));
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let err = EngineConfig::from_toml_str("history_capacity = \"lots\"").unwrap_err();
        assert!(matches!(err, crate::error::AuthError::ConfigError(_)));
    }

    #[test]
    fn test_out_of_range_values_are_rejected() {
        for toml in [
            "token_ttl_minutes = 9223372036854775807",
            "token_ttl_minutes = 1000000000000",
            "token_ttl_minutes = -5",
            "token_ttl_minutes = 0",
            "velocity_window_minutes = -60",
            "history_capacity = 0",
            "confidence_base = 7.0",
            "confidence_base = -0.1",
            "decision_threshold = 100.5",
            "decision_threshold = nan",
        ] {
            let err = EngineConfig::from_toml_str(toml).unwrap_err();
            assert!(
                matches!(err, crate::error::AuthError::ValidationError(_)),
                "{toml} gave {err}"
            );
        }
    }

    #[test]
    fn test_range_edges_are_accepted() {
        let toml = format!(
            "confidence_base = 1.0\ndecision_threshold = 0.0\ntoken_ttl_minutes = {MAX_WINDOW_MINUTES}\nvelocity_window_minutes = 1\nhistory_capacity = 1"
        );
        let config = EngineConfig::from_toml_str(&toml).unwrap();
        assert_eq!(config.token_ttl(), Duration::minutes(MAX_WINDOW_MINUTES));
        assert!(EngineConfig::default().validate().is_ok());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("engine.toml");
        std::fs::write(&path, "token_ttl_minutes = 5\n").unwrap();

        let config = EngineConfig::load(&path).unwrap();
        assert_eq!(config.token_ttl_minutes, 5);
    }
}
