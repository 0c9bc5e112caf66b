//! Simulation driver: replays bars through a strategy and the position
//! lifecycle, then hands the completed trades to the metrics calculator.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::Duration;
use tracing::{debug, info, warn};

use super::error::{BacktestError, StepError};
use super::execution::{self, CostModel};
use super::instrument::InstrumentSpec;
use super::metrics::{self, BacktestResults, TestWindow};
use super::ohlcv::Bar;
use super::position::{CompletedTrade, ExitReason, Position, PositionState};
use super::signal::Signal;
use super::strategy::Strategy;

pub const DEFAULT_WARMUP_BARS: usize = 100;
pub const DEFAULT_MIN_CONFIDENCE: f64 = 60.0;
pub const DEFAULT_MAX_HOLDING_HOURS: i64 = 24;

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestConfig {
    pub initial_balance: f64,
    /// Fraction of the current balance risked per trade.
    pub risk_fraction: f64,
    /// Bars skipped before the first strategy evaluation.
    pub warmup_bars: usize,
    /// Entry signals below this confidence are ignored.
    pub min_confidence: f64,
    pub max_holding: Duration,
    pub annualization_factor: f64,
    pub cost: CostModel,
    pub instrument: InstrumentSpec,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        BacktestConfig {
            initial_balance: 10_000.0,
            risk_fraction: 0.02,
            warmup_bars: DEFAULT_WARMUP_BARS,
            min_confidence: DEFAULT_MIN_CONFIDENCE,
            max_holding: Duration::hours(DEFAULT_MAX_HOLDING_HOURS),
            annualization_factor: metrics::DEFAULT_ANNUALIZATION_FACTOR,
            cost: CostModel::default(),
            instrument: InstrumentSpec::default(),
        }
    }
}

/// Cooperative stop flag, checked between bars.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Run a single backtest over `bars`.
///
/// Only `InsufficientData` is fatal. Strategy errors, strategy panics and
/// malformed signals are logged and the bar is skipped. On cancellation the
/// open position is closed on the last processed bar and the results are
/// marked `truncated`.
pub fn run_backtest<S: Strategy + ?Sized>(
    bars: &[Bar],
    strategy: &S,
    config: &BacktestConfig,
    cancel: Option<&CancellationToken>,
) -> Result<BacktestResults, BacktestError> {
    let minimum = config.warmup_bars + 1;
    if bars.len() < minimum {
        return Err(BacktestError::InsufficientData {
            bars: bars.len(),
            minimum,
        });
    }

    info!(
        strategy = strategy.id(),
        bars = bars.len(),
        warmup = config.warmup_bars,
        "starting backtest"
    );

    let mut run = Run::new(config);
    let mut last_index: Option<usize> = None;
    let mut truncated = false;

    for index in config.warmup_bars..bars.len() {
        if cancel.is_some_and(CancellationToken::is_cancelled) {
            info!(index, "backtest cancelled");
            truncated = true;
            break;
        }
        last_index = Some(index);
        let bar = &bars[index];

        let exit = run
            .state
            .position()
            .and_then(|p| execution::check_exit(p, bar, config.max_holding));
        if let Some(reason) = exit {
            run.close(bar, reason);
            // Re-entry waits for the next bar.
            continue;
        }

        match evaluate(strategy, &bars[..=index], index) {
            Signal::NoAction => {}
            Signal::Exit => {
                if run.state.is_open() {
                    run.close(bar, ExitReason::Signal);
                }
            }
            Signal::Enter(entry) => {
                if run.state.is_open() || entry.confidence < config.min_confidence {
                    continue;
                }
                match execution::open_position(
                    &entry,
                    bar,
                    &config.cost,
                    &config.instrument,
                    config.risk_fraction,
                    run.balance,
                ) {
                    Ok(position) => run.open(position),
                    Err(err) => warn!(index, error = %err, "entry rejected, skipping bar"),
                }
            }
        }
    }

    if let Some(last) = last_index
        && run.state.is_open()
    {
        run.close(&bars[last], ExitReason::EndOfData);
    }

    // Nothing processed: the window collapses to the first bar.
    let start = bars[0].timestamp;
    let window = TestWindow {
        start,
        end: last_index.map_or(start, |i| bars[i].timestamp),
    };
    let mut results = metrics::calculate(
        config.initial_balance,
        &run.trades,
        window,
        config.annualization_factor,
    );
    results.truncated = truncated;

    info!(
        trades = results.total_trades,
        final_balance = results.final_balance,
        truncated,
        "backtest finished"
    );
    Ok(results)
}

/// Mutable state of one run. Never shared between runs.
struct Run<'a> {
    config: &'a BacktestConfig,
    state: PositionState,
    balance: f64,
    trades: Vec<CompletedTrade>,
}

impl<'a> Run<'a> {
    fn new(config: &'a BacktestConfig) -> Self {
        Run {
            config,
            state: PositionState::Flat,
            balance: config.initial_balance,
            trades: Vec::new(),
        }
    }

    fn open(&mut self, position: Position) {
        debug!(
            direction = %position.direction,
            entry = position.entry_price,
            lots = position.lot_size,
            time = %position.entry_time,
            "position opened"
        );
        self.state.open(position);
    }

    fn close(&mut self, bar: &Bar, reason: ExitReason) {
        let Some(position) = self.state.take() else {
            return;
        };
        let trade = execution::close_position(
            position,
            bar,
            reason,
            &self.config.cost,
            &self.config.instrument,
        );
        self.balance += trade.profit_loss;
        debug!(
            reason = %trade.exit_reason,
            exit = trade.exit_price,
            pnl = trade.profit_loss,
            balance = self.balance,
            time = %trade.exit_time,
            "position closed"
        );
        self.trades.push(trade);
    }
}

/// Strategy output for one bar. Errors and panics degrade to `NoAction`.
///
/// The process panic hook still runs before the unwind is caught, so the
/// default hook prints each panic to stderr next to the `warn!` event.
/// Callers that want only the log line can install a quiet hook with
/// [`std::panic::set_hook`].
fn evaluate<S: Strategy + ?Sized>(strategy: &S, history: &[Bar], index: usize) -> Signal {
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| strategy.evaluate(history, index)));
    let reason = match outcome {
        Ok(Ok(signal)) => return signal,
        Ok(Err(err)) => err.reason,
        Err(payload) => panic_message(payload.as_ref()),
    };
    let err = StepError::StrategyEvaluation { index, reason };
    warn!(strategy = strategy.id(), error = %err, "treating bar as no action");
    Signal::NoAction
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("panicked: {s}")
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("panicked: {s}")
    } else {
        "panicked".to_string()
    }
}
