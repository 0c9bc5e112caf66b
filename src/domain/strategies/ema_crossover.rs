//! EMA crossover with RSI filter and ATR-based exits.

use crate::domain::indicator::{atr, ema, rsi};
use crate::domain::ohlcv::Bar;
use crate::domain::signal::{Direction, EntrySignal, Signal};
use crate::domain::strategy::{Strategy, StrategyError};

#[derive(Debug, Clone, PartialEq)]
pub struct EmaCrossoverParams {
    pub fast_period: usize,
    pub slow_period: usize,
    pub rsi_period: usize,
    pub atr_period: usize,
    pub stop_atr_multiple: f64,
    pub target_atr_multiple: f64,
}

impl Default for EmaCrossoverParams {
    fn default() -> Self {
        EmaCrossoverParams {
            fast_period: 12,
            slow_period: 26,
            rsi_period: 14,
            atr_period: 14,
            stop_atr_multiple: 2.0,
            target_atr_multiple: 3.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct EmaCrossover {
    params: EmaCrossoverParams,
}

impl EmaCrossover {
    pub const ID: &'static str = "ema_crossover";

    pub fn new(params: EmaCrossoverParams) -> Self {
        EmaCrossover { params }
    }

    fn lookback(&self) -> usize {
        let p = &self.params;
        // EMA seeds from an SMA; a few multiples of the slow period let it converge.
        (p.slow_period * 3)
            .max(p.fast_period * 3)
            .max(p.rsi_period * 2 + 1)
            .max(p.atr_period + 1)
    }

    /// RSI near 50 and a wide EMA separation relative to ATR both add
    /// confidence. Result is clamped to 50..=95.
    fn confidence(rsi: f64, separation: f64, atr: f64) -> f64 {
        let rsi_score = (1.0 - (rsi - 50.0).abs() / 20.0).max(0.0) * 25.0;
        let separation_score = if atr > 0.0 {
            (separation.abs() / atr).min(1.0) * 20.0
        } else {
            0.0
        };
        (50.0 + rsi_score + separation_score).clamp(50.0, 95.0)
    }
}

impl Default for EmaCrossover {
    fn default() -> Self {
        EmaCrossover::new(EmaCrossoverParams::default())
    }
}

impl Strategy for EmaCrossover {
    fn id(&self) -> &str {
        Self::ID
    }

    fn evaluate(&self, history: &[Bar], _index: usize) -> Result<Signal, StrategyError> {
        let p = &self.params;
        if p.fast_period == 0 || p.slow_period == 0 || p.rsi_period == 0 || p.atr_period == 0 {
            return Err(StrategyError::new("indicator periods must be positive"));
        }
        if p.fast_period >= p.slow_period {
            return Err(StrategyError::new(format!(
                "fast period {} must be shorter than slow period {}",
                p.fast_period, p.slow_period
            )));
        }

        let lookback = self.lookback();
        if history.len() < p.slow_period + 1 {
            return Ok(Signal::NoAction);
        }
        let window = &history[history.len().saturating_sub(lookback)..];
        let last = window.len() - 1;

        let fast = ema::calculate_ema(window, p.fast_period);
        let slow = ema::calculate_ema(window, p.slow_period);
        let (Some(fast_now), Some(fast_prev), Some(slow_now), Some(slow_prev)) = (
            fast.value_at(last),
            fast.value_at(last - 1),
            slow.value_at(last),
            slow.value_at(last - 1),
        ) else {
            return Ok(Signal::NoAction);
        };

        let direction = if fast_prev <= slow_prev && fast_now > slow_now {
            Direction::Long
        } else if fast_prev >= slow_prev && fast_now < slow_now {
            Direction::Short
        } else {
            return Ok(Signal::NoAction);
        };

        let (Some(rsi), Some(atr)) = (
            rsi::calculate_rsi(window, p.rsi_period).last_value(),
            atr::calculate_atr(window, p.atr_period).last_value(),
        ) else {
            return Ok(Signal::NoAction);
        };
        if rsi <= 30.0 || rsi >= 70.0 || atr <= 0.0 {
            return Ok(Signal::NoAction);
        }

        let price = window[last].close;
        let sign = direction.sign();
        Ok(Signal::Enter(EntrySignal {
            direction,
            confidence: Self::confidence(rsi, fast_now - slow_now, atr),
            stop_loss: price - sign * p.stop_atr_multiple * atr,
            take_profit: price + sign * p.target_atr_multiple * atr,
            strategy_id: Self::ID.to_string(),
        }))
    }
}
