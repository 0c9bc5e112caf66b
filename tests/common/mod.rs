#![allow(dead_code)]

use chrono::{Duration, NaiveDate, NaiveDateTime};
use fxbacktest::domain::backtest::BacktestConfig;
use fxbacktest::domain::error::BacktestError;
use fxbacktest::domain::execution::CostModel;
pub use fxbacktest::domain::ohlcv::Bar;
use fxbacktest::domain::signal::{Direction, EntrySignal, Signal};
use fxbacktest::domain::strategy::{FnStrategy, StrategyError};
use fxbacktest::ports::data_port::DataPort;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

pub struct MockDataPort {
    pub data: HashMap<String, Vec<Bar>>,
    pub errors: HashMap<String, String>,
    pub fetch_calls: AtomicUsize,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
            fetch_calls: AtomicUsize::new(0),
        }
    }

    pub fn with_bars(mut self, symbol: &str, bars: Vec<Bar>) -> Self {
        self.data.insert(symbol.to_string(), bars);
        self
    }

    pub fn fetch_count(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    pub fn with_error(mut self, symbol: &str, reason: &str) -> Self {
        self.errors.insert(symbol.to_string(), reason.to_string());
        self
    }
}

impl DataPort for MockDataPort {
    fn fetch_bars(
        &self,
        symbol: &str,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<Vec<Bar>, BacktestError> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(reason) = self.errors.get(symbol) {
            return Err(BacktestError::Data {
                reason: reason.clone(),
            });
        }
        Ok(self
            .data
            .get(symbol)
            .map(|bars| {
                bars.iter()
                    .filter(|b| b.timestamp >= start && b.timestamp <= end)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    fn list_symbols(&self) -> Result<Vec<String>, BacktestError> {
        let mut symbols: Vec<String> = self.data.keys().cloned().collect();
        symbols.sort();
        Ok(symbols)
    }
}

pub fn t0() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 1, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
}

pub fn hour(i: usize) -> NaiveDateTime {
    t0() + Duration::hours(i as i64)
}

/// Hourly bar with an explicit range.
pub fn make_bar(i: usize, low: f64, high: f64, close: f64) -> Bar {
    Bar {
        timestamp: hour(i),
        open: close,
        high,
        low,
        close,
        volume: 1000.0,
    }
}

/// Hourly bars with open = high = low = close.
pub fn flat_bars(closes: &[f64]) -> Vec<Bar> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &c)| make_bar(i, c, c, c))
        .collect()
}

pub fn constant_bars(n: usize, price: f64) -> Vec<Bar> {
    flat_bars(&vec![price; n])
}

/// Deterministic oscillating series around 1.10 with a slow drift.
pub fn wavy_bars(n: usize) -> Vec<Bar> {
    (0..n)
        .map(|i| {
            let x = i as f64;
            let close = 1.10 + 0.004 * (x / 7.0).sin() + 0.002 * (x / 23.0).cos() + x * 0.00001;
            make_bar(i, close - 0.0006, close + 0.0006, close)
        })
        .collect()
}

/// Config without costs and a short warm-up.
pub fn test_config(warmup_bars: usize) -> BacktestConfig {
    BacktestConfig {
        warmup_bars,
        cost: CostModel::zero(),
        ..BacktestConfig::default()
    }
}

pub fn entry(direction: Direction, close: f64, stop_pips: f64, target_pips: f64) -> Signal {
    let pip = 0.0001;
    let sign = direction.sign();
    Signal::Enter(EntrySignal {
        direction,
        confidence: 80.0,
        stop_loss: close - sign * stop_pips * pip,
        take_profit: close + sign * target_pips * pip,
        strategy_id: "scripted".to_string(),
    })
}

pub type ScriptFn = Box<dyn Fn(&[Bar], usize) -> Result<Signal, StrategyError> + Send + Sync>;

/// Strategy that returns `signals[index]` when present, `NoAction` otherwise.
pub fn scripted(signals: HashMap<usize, Signal>) -> FnStrategy<ScriptFn> {
    let func: ScriptFn = Box::new(move |_: &[Bar], index: usize| {
        Ok(signals.get(&index).cloned().unwrap_or(Signal::NoAction))
    });
    FnStrategy::new("scripted", func)
}

/// Long on every bar where flat, 20-pip stop and 20-pip target.
pub fn always_long() -> FnStrategy<ScriptFn> {
    let func: ScriptFn = Box::new(|history: &[Bar], index: usize| {
        Ok(entry(Direction::Long, history[index].close, 20.0, 20.0))
    });
    FnStrategy::new("always_long", func)
}
