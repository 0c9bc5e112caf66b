//! Strategy output: trade direction and signals.

use serde::Serialize;
use std::fmt;

use super::error::StepError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Long,
    Short,
}

impl Direction {
    /// +1 for long, -1 for short.
    pub fn sign(self) -> f64 {
        match self {
            Direction::Long => 1.0,
            Direction::Short => -1.0,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Long => write!(f, "long"),
            Direction::Short => write!(f, "short"),
        }
    }
}

/// Request to open a position. Price levels are absolute.
#[derive(Debug, Clone, PartialEq)]
pub struct EntrySignal {
    pub direction: Direction,
    /// 0..=100
    pub confidence: f64,
    pub stop_loss: f64,
    pub take_profit: f64,
    pub strategy_id: String,
}

impl EntrySignal {
    /// Checks that do not depend on the fill price.
    pub fn check_well_formed(&self) -> Result<(), StepError> {
        if !self.stop_loss.is_finite() {
            return Err(StepError::invalid_signal(format!(
                "stop_loss is not finite ({})",
                self.stop_loss
            )));
        }
        if !self.take_profit.is_finite() {
            return Err(StepError::invalid_signal(format!(
                "take_profit is not finite ({})",
                self.take_profit
            )));
        }
        if !(0.0..=100.0).contains(&self.confidence) {
            return Err(StepError::invalid_signal(format!(
                "confidence {} outside 0..=100",
                self.confidence
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Signal {
    NoAction,
    Enter(EntrySignal),
    /// Close the open position at this bar, if any.
    Exit,
}
