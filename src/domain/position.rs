//! Open position, position state machine, and completed trades.

use chrono::NaiveDateTime;
use serde::Serialize;
use std::fmt;

use super::signal::Direction;

#[derive(Debug, Clone, PartialEq)]
pub struct Position {
    pub direction: Direction,
    pub entry_time: NaiveDateTime,
    /// Fill price after the half-spread adjustment.
    pub entry_price: f64,
    pub lot_size: f64,
    pub stop_loss: f64,
    pub take_profit: f64,
    pub strategy_id: String,
    pub confidence: f64,
}

impl Position {
    pub fn is_long(&self) -> bool {
        self.direction == Direction::Long
    }

    pub fn is_short(&self) -> bool {
        self.direction == Direction::Short
    }

    /// True when the bar's adverse extreme reaches the stop.
    pub fn stop_touched(&self, low: f64, high: f64) -> bool {
        if self.is_long() {
            low <= self.stop_loss
        } else {
            high >= self.stop_loss
        }
    }

    /// True when the bar's favourable extreme reaches the target.
    pub fn target_touched(&self, low: f64, high: f64) -> bool {
        if self.is_long() {
            high >= self.take_profit
        } else {
            low <= self.take_profit
        }
    }
}

/// At most one position exists per run; the driver owns this value.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum PositionState {
    #[default]
    Flat,
    Open(Position),
}

impl PositionState {
    pub fn is_open(&self) -> bool {
        matches!(self, PositionState::Open(_))
    }

    pub fn position(&self) -> Option<&Position> {
        match self {
            PositionState::Open(p) => Some(p),
            PositionState::Flat => None,
        }
    }

    /// Flat -> Open. Returns false and leaves the state untouched when a
    /// position is already open.
    pub fn open(&mut self, position: Position) -> bool {
        match self {
            PositionState::Flat => {
                *self = PositionState::Open(position);
                true
            }
            PositionState::Open(_) => false,
        }
    }

    /// Open -> Flat, handing the position back to the caller.
    pub fn take(&mut self) -> Option<Position> {
        match std::mem::take(self) {
            PositionState::Open(p) => Some(p),
            PositionState::Flat => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitReason {
    StopLoss,
    TakeProfit,
    TimeLimit,
    EndOfData,
    /// Strategy asked to close.
    Signal,
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ExitReason::StopLoss => "stop_loss",
            ExitReason::TakeProfit => "take_profit",
            ExitReason::TimeLimit => "time_limit",
            ExitReason::EndOfData => "end_of_data",
            ExitReason::Signal => "signal",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompletedTrade {
    pub entry_time: NaiveDateTime,
    pub exit_time: NaiveDateTime,
    pub direction: Direction,
    pub entry_price: f64,
    pub exit_price: f64,
    pub lot_size: f64,
    /// Signed, in pips of the instrument.
    pub pips: f64,
    pub commission: f64,
    /// Net of commission, account currency.
    pub profit_loss: f64,
    pub confidence: f64,
    pub strategy_id: String,
    pub exit_reason: ExitReason,
}

impl CompletedTrade {
    pub fn duration_hours(&self) -> f64 {
        (self.exit_time - self.entry_time).num_seconds() as f64 / 3600.0
    }
}
