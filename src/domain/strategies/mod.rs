//! Bundled strategies and the name-based factory used by the CLI.

pub mod ema_crossover;
pub mod trend_rsi;

use std::fmt;
use std::str::FromStr;

pub use ema_crossover::{EmaCrossover, EmaCrossoverParams};
pub use trend_rsi::{TrendRsi, TrendRsiParams};

use super::instrument::InstrumentSpec;
use super::strategy::Strategy;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyKind {
    TrendRsi,
    EmaCrossover,
}

impl StrategyKind {
    pub const ALL: [StrategyKind; 2] = [StrategyKind::TrendRsi, StrategyKind::EmaCrossover];

    pub fn name(self) -> &'static str {
        match self {
            StrategyKind::TrendRsi => TrendRsi::ID,
            StrategyKind::EmaCrossover => EmaCrossover::ID,
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for StrategyKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        StrategyKind::ALL
            .into_iter()
            .find(|kind| kind.name() == normalized)
            .ok_or_else(|| {
                let known: Vec<&str> = StrategyKind::ALL.iter().map(|k| k.name()).collect();
                format!("unknown strategy '{}' (expected one of: {})", s, known.join(", "))
            })
    }
}

/// `[strategy]` section contents. Unset periods fall back to each strategy's defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct StrategyConfig {
    pub kind: StrategyKind,
    pub fast_period: Option<usize>,
    pub slow_period: Option<usize>,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        StrategyConfig {
            kind: StrategyKind::TrendRsi,
            fast_period: None,
            slow_period: None,
        }
    }
}

impl StrategyConfig {
    /// Fast and slow periods with the kind's defaults filled in.
    pub fn resolved_periods(&self) -> (usize, usize) {
        let (fast, slow) = match self.kind {
            StrategyKind::TrendRsi => {
                let d = TrendRsiParams::default();
                (d.fast_period, d.slow_period)
            }
            StrategyKind::EmaCrossover => {
                let d = EmaCrossoverParams::default();
                (d.fast_period, d.slow_period)
            }
        };
        (self.fast_period.unwrap_or(fast), self.slow_period.unwrap_or(slow))
    }
}

pub fn build_strategy(
    config: &StrategyConfig,
    instrument: &InstrumentSpec,
) -> Box<dyn Strategy + Send + Sync> {
    let (fast_period, slow_period) = config.resolved_periods();
    match config.kind {
        StrategyKind::TrendRsi => Box::new(TrendRsi::new(TrendRsiParams {
            fast_period,
            slow_period,
            pip_size: instrument.pip_size,
            ..TrendRsiParams::default()
        })),
        StrategyKind::EmaCrossover => Box::new(EmaCrossover::new(EmaCrossoverParams {
            fast_period,
            slow_period,
            ..EmaCrossoverParams::default()
        })),
    }
}
