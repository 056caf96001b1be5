//! Core domain types and logic.

pub mod series;
pub mod indicator;
pub mod backtest;
pub mod metrics;
pub mod validation;
pub mod config_validation;
pub mod error;
