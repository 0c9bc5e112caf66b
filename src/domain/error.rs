//! Domain error types.
//!
//! [`StepError`] covers failures local to a single bar: the driver logs them
//! and moves on. [`BacktestError`] covers everything that ends a run or an
//! outer-surface operation (config, data, reports).

use chrono::NaiveDateTime;

/// A per-bar failure. Never aborts a simulation.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StepError {
    #[error("invalid signal: {reason}")]
    InvalidSignal { reason: String },

    #[error("invalid stop distance {distance} (entry {entry_price}, stop {stop_loss})")]
    InvalidStopDistance {
        entry_price: f64,
        stop_loss: f64,
        distance: f64,
    },

    #[error("strategy evaluation failed at index {index}: {reason}")]
    StrategyEvaluation { index: usize, reason: String },
}

impl StepError {
    pub fn invalid_signal(reason: impl Into<String>) -> Self {
        StepError::InvalidSignal {
            reason: reason.into(),
        }
    }
}

/// Top-level error type for fxbacktest.
#[derive(Debug, thiserror::Error)]
pub enum BacktestError {
    #[error("insufficient data: have {bars} bars, need at least {minimum}")]
    InsufficientData { bars: usize, minimum: usize },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("data error: {reason}")]
    Data { reason: String },

    #[error("duplicate bar timestamp {timestamp}")]
    DuplicateBar { timestamp: NaiveDateTime },

    #[error("report error: {reason}")]
    Report { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl BacktestError {
    pub fn config_invalid(section: &str, key: &str, reason: impl Into<String>) -> Self {
        BacktestError::ConfigInvalid {
            section: section.to_string(),
            key: key.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<&BacktestError> for std::process::ExitCode {
    fn from(err: &BacktestError) -> Self {
        let code: u8 = match err {
            BacktestError::Io(_) | BacktestError::Report { .. } => 1,
            BacktestError::ConfigParse { .. }
            | BacktestError::ConfigMissing { .. }
            | BacktestError::ConfigInvalid { .. } => 2,
            BacktestError::Data { .. } | BacktestError::DuplicateBar { .. } => 3,
            BacktestError::InsufficientData { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}
