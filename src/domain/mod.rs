//! Domain types for the authorization decision engine: transactions, risk
//! assessments, decisions and the ports the engines depend on.

pub mod authorization;
pub mod ports;
pub mod risk;
pub mod transaction;
