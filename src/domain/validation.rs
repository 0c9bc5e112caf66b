//! Out-of-sample validation.
//!
//! The bar series is split chronologically; the driver runs on each part
//! independently and the out-of-sample figures are compared against the
//! in-sample ones.

use serde::Serialize;
use tracing::info;

use super::backtest::{self, BacktestConfig};
use super::error::BacktestError;
use super::metrics::BacktestResults;
use super::ohlcv::Bar;
use super::strategy::Strategy;

/// Win-rate drop (percent of the in-sample win rate) that still passes.
pub const MAX_WIN_RATE_DEGRADATION: f64 = 20.0;
/// Average-trade P&L drop (percent) that still passes.
pub const MAX_PNL_DEGRADATION: f64 = 30.0;
/// Out-of-sample win rate must exceed this.
pub const MIN_OUT_OF_SAMPLE_WIN_RATE: f64 = 45.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Approved,
    NeedsOptimization,
    /// One of the partitions produced no trades.
    InsufficientTrades,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationReport {
    pub in_sample: BacktestResults,
    pub out_of_sample: BacktestResults,
    pub win_rate_degradation: f64,
    pub pnl_degradation: f64,
    pub verdict: Verdict,
}

impl ValidationReport {
    pub fn is_approved(&self) -> bool {
        self.verdict == Verdict::Approved
    }
}

/// Compare in-sample and out-of-sample runs.
///
/// `out_of_sample_fraction` is the trailing share of `bars` held out and
/// must lie strictly between 0 and 1.
pub fn validate_out_of_sample<S: Strategy + ?Sized>(
    bars: &[Bar],
    strategy: &S,
    config: &BacktestConfig,
    out_of_sample_fraction: f64,
) -> Result<ValidationReport, BacktestError> {
    if !(out_of_sample_fraction > 0.0 && out_of_sample_fraction < 1.0) {
        return Err(BacktestError::config_invalid(
            "backtest",
            "out_of_sample_fraction",
            format!("{out_of_sample_fraction} is not between 0 and 1"),
        ));
    }

    let split = ((bars.len() as f64) * (1.0 - out_of_sample_fraction)).round() as usize;
    let (in_bars, out_bars) = bars.split_at(split.min(bars.len()));
    info!(
        in_sample = in_bars.len(),
        out_of_sample = out_bars.len(),
        "running out-of-sample validation"
    );

    let in_sample = backtest::run_backtest(in_bars, strategy, config, None)?;
    let out_of_sample = backtest::run_backtest(out_bars, strategy, config, None)?;
    Ok(compare(in_sample, out_of_sample))
}

/// Degradation figures and verdict for a pair of runs.
pub fn compare(in_sample: BacktestResults, out_of_sample: BacktestResults) -> ValidationReport {
    let win_rate_degradation = if in_sample.win_rate > 0.0 {
        (in_sample.win_rate - out_of_sample.win_rate) / in_sample.win_rate * 100.0
    } else {
        0.0
    };
    let pnl_degradation = if in_sample.average_trade != 0.0 {
        (in_sample.average_trade - out_of_sample.average_trade) / in_sample.average_trade.abs()
            * 100.0
    } else {
        0.0
    };

    let verdict = if in_sample.total_trades == 0 || out_of_sample.total_trades == 0 {
        Verdict::InsufficientTrades
    } else if win_rate_degradation < MAX_WIN_RATE_DEGRADATION
        && pnl_degradation < MAX_PNL_DEGRADATION
        && out_of_sample.win_rate > MIN_OUT_OF_SAMPLE_WIN_RATE
    {
        Verdict::Approved
    } else {
        Verdict::NeedsOptimization
    };

    ValidationReport {
        in_sample,
        out_of_sample,
        win_rate_degradation,
        pnl_degradation,
        verdict,
    }
}
