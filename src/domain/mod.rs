//! Core domain types and logic.

pub mod ohlcv;
pub mod indicator;
pub mod signal;
pub mod portfolio;
pub mod executor;
pub mod simulation;
pub mod metrics;
pub mod config_validation;
pub mod error;
