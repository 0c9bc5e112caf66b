//! Parameter sweeps: many isolated backtests over the same bars.

use rayon::prelude::*;
use tracing::info;

use super::backtest::{self, BacktestConfig, CancellationToken};
use super::error::BacktestError;
use super::metrics::BacktestResults;
use super::ohlcv::Bar;
use super::strategies::{self, StrategyConfig, StrategyKind};
use super::strategy::Strategy;

/// One strategy/config pair to run.
pub struct SweepCandidate {
    pub label: String,
    pub strategy: Box<dyn Strategy + Send + Sync>,
    pub config: BacktestConfig,
}

#[derive(Debug)]
pub struct SweepOutcome {
    pub label: String,
    pub result: Result<BacktestResults, BacktestError>,
}

/// Fast/slow period grid for one of the bundled strategies.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamGrid {
    pub kind: StrategyKind,
    pub fast_periods: Vec<usize>,
    pub slow_periods: Vec<usize>,
}

impl ParamGrid {
    /// Candidates for every fast < slow combination.
    pub fn candidates(&self, base: &BacktestConfig) -> Vec<SweepCandidate> {
        let mut candidates = Vec::new();
        for &fast in &self.fast_periods {
            for &slow in &self.slow_periods {
                if fast >= slow {
                    continue;
                }
                let strategy_config = StrategyConfig {
                    kind: self.kind,
                    fast_period: Some(fast),
                    slow_period: Some(slow),
                };
                candidates.push(SweepCandidate {
                    label: format!("{}({fast},{slow})", self.kind),
                    strategy: strategies::build_strategy(&strategy_config, &base.instrument),
                    config: base.clone(),
                });
            }
        }
        candidates
    }
}

/// Run every candidate in parallel. Outcomes keep the input order.
///
/// Runs share only the read-only bar slice; each failure is reported
/// against its own candidate.
pub fn run_sweep(
    bars: &[Bar],
    candidates: &[SweepCandidate],
    cancel: Option<&CancellationToken>,
) -> Vec<SweepOutcome> {
    info!(candidates = candidates.len(), bars = bars.len(), "starting sweep");
    candidates
        .par_iter()
        .map(|candidate| SweepOutcome {
            label: candidate.label.clone(),
            result: backtest::run_backtest(bars, &candidate.strategy, &candidate.config, cancel),
        })
        .collect()
}

/// Successful outcomes, best Sharpe ratio first.
pub fn rank_by_sharpe(outcomes: &[SweepOutcome]) -> Vec<(&str, &BacktestResults)> {
    let mut ranked: Vec<(&str, &BacktestResults)> = outcomes
        .iter()
        .filter_map(|o| o.result.as_ref().ok().map(|r| (o.label.as_str(), r)))
        .collect();
    ranked.sort_by(|a, b| b.1.sharpe_ratio.total_cmp(&a.1.sharpe_ratio));
    ranked
}
