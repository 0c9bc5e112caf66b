//! Core domain types and logic.

pub mod backtest;
pub mod config_validation;
pub mod error;
pub mod execution;
pub mod indicator;
pub mod instrument;
pub mod metrics;
pub mod ohlcv;
pub mod position;
pub mod signal;
pub mod strategies;
pub mod strategy;
pub mod sweep;
pub mod validation;
