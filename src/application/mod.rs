//! Application layer containing the decision logic.
//!
//! `RiskEngine` scores single transactions from per-customer history, and
//! `AuthorizationEngine` combines that score with pre-verification tokens to
//! approve, decline or pre-verify a purchase.

pub mod engine;
pub mod risk_engine;
