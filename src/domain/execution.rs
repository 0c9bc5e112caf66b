//! Position lifecycle: fills, sizing, exit triggers.
//!
//! Implements the transaction-cost model (half spread on entry, half spread
//! plus slippage on exit, per-lot commission at close), risk-based lot
//! sizing, and the stop-loss / take-profit / time-limit trigger order.

use chrono::Duration;
use serde::Serialize;

use super::error::StepError;
use super::instrument::InstrumentSpec;
use super::ohlcv::Bar;
use super::position::{CompletedTrade, ExitReason, Position};
use super::signal::{Direction, EntrySignal};

/// Transaction costs, all in price units except the commission.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CostModel {
    pub spread: f64,
    pub slippage: f64,
    /// Account currency per lot, charged once per round turn.
    pub commission_per_lot: f64,
}

impl Default for CostModel {
    fn default() -> Self {
        CostModel {
            spread: 0.00015,
            slippage: 0.00005,
            commission_per_lot: 0.0,
        }
    }
}

impl CostModel {
    pub fn zero() -> Self {
        CostModel {
            spread: 0.0,
            slippage: 0.0,
            commission_per_lot: 0.0,
        }
    }
}

/// Commission for a round turn of `lot_size` lots.
pub fn calculate_commission(lot_size: f64, cost: &CostModel) -> f64 {
    cost.commission_per_lot * lot_size
}

/// Long entry pays the ask: close + spread/2. Short entry hits the bid.
pub fn apply_entry_costs(close: f64, direction: Direction, cost: &CostModel) -> f64 {
    close + direction.sign() * cost.spread / 2.0
}

/// Exit costs always work against the trader.
pub fn apply_exit_costs(close: f64, direction: Direction, cost: &CostModel) -> f64 {
    close - direction.sign() * (cost.spread / 2.0 + cost.slippage)
}

/// Lots risking `balance * risk_fraction` over `stop_distance` (price units).
pub fn position_size(
    balance: f64,
    risk_fraction: f64,
    stop_distance: f64,
    instrument: &InstrumentSpec,
) -> f64 {
    let risk_amount = balance * risk_fraction;
    let stop_pips = instrument.to_pips(stop_distance);
    let raw = risk_amount / (stop_pips * instrument.pip_value);
    instrument.normalize_lots(raw)
}

/// Open a position from an entry signal at the bar's close.
///
/// Steps:
/// 1. Reject non-finite prices and out-of-range confidence
/// 2. Apply half spread to the close
/// 3. Reject a zero stop distance
/// 4. Reject stop/target on the wrong side of the fill
/// 5. Size by risk and clamp to the instrument's lot limits
pub fn open_position(
    signal: &EntrySignal,
    bar: &Bar,
    cost: &CostModel,
    instrument: &InstrumentSpec,
    risk_fraction: f64,
    balance: f64,
) -> Result<Position, StepError> {
    signal.check_well_formed()?;
    if !bar.close.is_finite() {
        return Err(StepError::invalid_signal(format!(
            "bar close is not finite ({})",
            bar.close
        )));
    }

    let entry_price = apply_entry_costs(bar.close, signal.direction, cost);

    let stop_distance = (entry_price - signal.stop_loss).abs();
    if stop_distance <= 0.0 {
        return Err(StepError::InvalidStopDistance {
            entry_price,
            stop_loss: signal.stop_loss,
            distance: stop_distance,
        });
    }

    let (stop_ok, target_ok) = match signal.direction {
        Direction::Long => (
            signal.stop_loss < entry_price,
            signal.take_profit > entry_price,
        ),
        Direction::Short => (
            signal.stop_loss > entry_price,
            signal.take_profit < entry_price,
        ),
    };
    if !stop_ok {
        return Err(StepError::invalid_signal(format!(
            "{} stop_loss {} on wrong side of entry {}",
            signal.direction, signal.stop_loss, entry_price
        )));
    }
    if !target_ok {
        return Err(StepError::invalid_signal(format!(
            "{} take_profit {} on wrong side of entry {}",
            signal.direction, signal.take_profit, entry_price
        )));
    }

    let lot_size = position_size(balance, risk_fraction, stop_distance, instrument);

    Ok(Position {
        direction: signal.direction,
        entry_time: bar.timestamp,
        entry_price,
        lot_size,
        stop_loss: signal.stop_loss,
        take_profit: signal.take_profit,
        strategy_id: signal.strategy_id.clone(),
        confidence: signal.confidence,
    })
}

/// First applicable exit reason for `position` on `bar`.
///
/// Stop-loss is checked before take-profit: when both levels fall inside
/// one bar the intrabar path is unknown and the worse fill is assumed.
pub fn check_exit(position: &Position, bar: &Bar, max_holding: Duration) -> Option<ExitReason> {
    if position.stop_touched(bar.low, bar.high) {
        return Some(ExitReason::StopLoss);
    }
    if position.target_touched(bar.low, bar.high) {
        return Some(ExitReason::TakeProfit);
    }
    if bar.timestamp - position.entry_time > max_holding {
        return Some(ExitReason::TimeLimit);
    }
    None
}

/// Close `position` at the bar's close, net of exit costs and commission.
pub fn close_position(
    position: Position,
    bar: &Bar,
    exit_reason: ExitReason,
    cost: &CostModel,
    instrument: &InstrumentSpec,
) -> CompletedTrade {
    let exit_price = apply_exit_costs(bar.close, position.direction, cost);
    let pips = position.direction.sign() * instrument.to_pips(exit_price - position.entry_price);
    let commission = calculate_commission(position.lot_size, cost);
    let profit_loss = pips * position.lot_size * instrument.pip_value - commission;

    CompletedTrade {
        entry_time: position.entry_time,
        exit_time: bar.timestamp,
        direction: position.direction,
        entry_price: position.entry_price,
        exit_price,
        lot_size: position.lot_size,
        pips,
        commission,
        profit_loss,
        confidence: position.confidence,
        strategy_id: position.strategy_id,
        exit_reason,
    }
}
