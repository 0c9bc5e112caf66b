//! Trend filter with RSI guard.
//!
//! Long when close > SMA(fast) > SMA(slow) and RSI sits between 30 and 70,
//! short on the mirror image. Stops and targets sit a fixed number of pips
//! from the close.

use crate::domain::indicator::{rsi, sma, stddev};
use crate::domain::ohlcv::Bar;
use crate::domain::signal::{Direction, EntrySignal, Signal};
use crate::domain::strategy::{Strategy, StrategyError};

#[derive(Debug, Clone, PartialEq)]
pub struct TrendRsiParams {
    pub fast_period: usize,
    pub slow_period: usize,
    pub rsi_period: usize,
    pub volatility_period: usize,
    /// Close-price stddev above which confidence is reduced.
    pub volatility_threshold: f64,
    pub momentum_period: usize,
    /// Fractional move over `momentum_period` that adds confidence.
    pub momentum_threshold: f64,
    pub stop_pips: f64,
    pub target_pips: f64,
    pub pip_size: f64,
}

impl Default for TrendRsiParams {
    fn default() -> Self {
        TrendRsiParams {
            fast_period: 20,
            slow_period: 50,
            rsi_period: 14,
            volatility_period: 20,
            volatility_threshold: 0.002,
            momentum_period: 10,
            momentum_threshold: 0.001,
            stop_pips: 20.0,
            target_pips: 40.0,
            pip_size: 0.0001,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TrendRsi {
    params: TrendRsiParams,
}

impl TrendRsi {
    pub const ID: &'static str = "trend_rsi";

    pub fn new(params: TrendRsiParams) -> Self {
        TrendRsi { params }
    }

    fn lookback(&self) -> usize {
        let p = &self.params;
        p.slow_period
            .max(p.fast_period)
            .max(p.rsi_period + 1)
            .max(p.volatility_period)
            .max(p.momentum_period + 1)
    }

    fn confidence(&self, window: &[Bar], price: f64) -> f64 {
        let p = &self.params;
        let mut confidence = 65.0;

        let volatility = stddev::calculate_stddev(window, p.volatility_period)
            .last_value()
            .unwrap_or(0.0);
        if volatility > p.volatility_threshold {
            confidence -= 15.0;
        }

        let reference = window[window.len() - p.momentum_period].close;
        if reference != 0.0 {
            let momentum = (price - reference) / reference;
            if momentum.abs() > p.momentum_threshold {
                confidence += 10.0;
            }
        }
        confidence
    }
}

impl Default for TrendRsi {
    fn default() -> Self {
        TrendRsi::new(TrendRsiParams::default())
    }
}

impl Strategy for TrendRsi {
    fn id(&self) -> &str {
        Self::ID
    }

    fn evaluate(&self, history: &[Bar], _index: usize) -> Result<Signal, StrategyError> {
        let p = &self.params;
        if p.fast_period == 0 || p.slow_period == 0 || p.rsi_period == 0 {
            return Err(StrategyError::new("indicator periods must be positive"));
        }

        let lookback = self.lookback();
        if history.len() < lookback {
            return Ok(Signal::NoAction);
        }
        // Extra bars let RSI's smoothing settle.
        let start = history.len().saturating_sub(lookback + p.rsi_period);
        let window = &history[start..];
        let price = window[window.len() - 1].close;

        let (Some(fast), Some(slow), Some(rsi)) = (
            sma::calculate_sma(window, p.fast_period).last_value(),
            sma::calculate_sma(window, p.slow_period).last_value(),
            rsi::calculate_rsi(window, p.rsi_period).last_value(),
        ) else {
            return Ok(Signal::NoAction);
        };

        if rsi <= 30.0 || rsi >= 70.0 {
            return Ok(Signal::NoAction);
        }

        let direction = if price > fast && fast > slow {
            Direction::Long
        } else if price < fast && fast < slow {
            Direction::Short
        } else {
            return Ok(Signal::NoAction);
        };

        let stop_distance = p.stop_pips * p.pip_size;
        let target_distance = p.target_pips * p.pip_size;
        let sign = direction.sign();

        Ok(Signal::Enter(EntrySignal {
            direction,
            confidence: self.confidence(window, price),
            stop_loss: price - sign * stop_distance,
            take_profit: price + sign * target_distance,
            strategy_id: Self::ID.to_string(),
        }))
    }
}
