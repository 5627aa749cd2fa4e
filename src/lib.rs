//! Union benefit tracking: eligibility rules and period-aware usage
//! accounting over collective agreement benefits.

pub mod benefits;
pub mod config;
pub mod error;
pub mod telemetry;
