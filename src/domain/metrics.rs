//! Performance metrics computed from a run's completed trades.
//!
//! Everything here is a pure function of the trade list, the starting
//! balance and the annualization factor. Percentages are ×100 values.

use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use serde::{Serialize, Serializer};

use super::indicator::stddev::population_stddev;
use super::position::CompletedTrade;

pub const DEFAULT_ANNUALIZATION_FACTOR: f64 = 252.0;

/// Standard deviations below this are treated as zero.
const STDDEV_EPSILON: f64 = 1e-12;

/// Gross profit over gross loss. `Infinite` when there are winners and no losers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ProfitFactor {
    Finite(f64),
    Infinite,
}

impl ProfitFactor {
    pub fn from_gross(gross_profit: f64, gross_loss: f64) -> Self {
        if gross_loss > 0.0 {
            ProfitFactor::Finite(gross_profit / gross_loss)
        } else if gross_profit > 0.0 {
            ProfitFactor::Infinite
        } else {
            ProfitFactor::Finite(0.0)
        }
    }

    pub fn is_infinite(&self) -> bool {
        matches!(self, ProfitFactor::Infinite)
    }

    pub fn as_f64(&self) -> f64 {
        match self {
            ProfitFactor::Finite(value) => *value,
            ProfitFactor::Infinite => f64::INFINITY,
        }
    }
}

impl Serialize for ProfitFactor {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ProfitFactor::Finite(value) => serializer.serialize_f64(*value),
            ProfitFactor::Infinite => serializer.serialize_str("inf"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StrategyStats {
    pub trades: usize,
    pub winning_trades: usize,
    pub win_rate: f64,
    pub total_pnl: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct DrawdownAnalysis {
    /// Number of distinct peak-to-recovery episodes, including an unrecovered one.
    pub episodes: usize,
    /// Longest episode, in equity-curve points below the running peak.
    pub longest_episode_trades: usize,
    /// Largest peak-to-trough decline in account currency.
    pub max_drawdown_amount: f64,
    /// Net profit divided by `max_drawdown_amount`; 0 without a drawdown.
    pub recovery_factor: f64,
    pub in_drawdown_at_end: bool,
}

/// Simulated range covered by a run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TestWindow {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BacktestResults {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub initial_balance: f64,
    pub final_balance: f64,

    pub total_trades: usize,
    pub winning_trades: usize,
    pub losing_trades: usize,
    pub win_rate: f64,
    pub gross_profit: f64,
    pub gross_loss: f64,
    pub profit_factor: ProfitFactor,
    pub total_profit: f64,
    pub total_return_pct: f64,
    pub max_drawdown: f64,
    pub sharpe_ratio: f64,

    pub sortino_ratio: f64,
    pub calmar_ratio: f64,
    pub average_trade: f64,
    pub avg_win: f64,
    /// Magnitude of the average losing trade.
    pub avg_loss: f64,
    pub largest_win: f64,
    /// Magnitude of the largest losing trade.
    pub largest_loss: f64,
    pub expectancy: f64,
    pub avg_trade_duration_hours: f64,

    pub equity_curve: Vec<f64>,
    pub monthly_returns: BTreeMap<String, f64>,
    pub strategy_breakdown: BTreeMap<String, StrategyStats>,
    pub drawdown_analysis: DrawdownAnalysis,
    /// Sorted by exit time.
    pub trades: Vec<CompletedTrade>,
    /// Set when the run was cancelled before reaching the last bar.
    pub truncated: bool,
}

/// Build a results object from `trades`.
///
/// Trades are ordered by exit time before the equity curve is built.
pub fn calculate(
    initial_balance: f64,
    trades: &[CompletedTrade],
    window: TestWindow,
    annualization_factor: f64,
) -> BacktestResults {
    let mut trades = trades.to_vec();
    trades.sort_by_key(|t| t.exit_time);

    let total_trades = trades.len();
    let mut winning_trades = 0usize;
    let mut losing_trades = 0usize;
    let mut gross_profit = 0.0_f64;
    let mut gross_loss = 0.0_f64;
    let mut largest_win = 0.0_f64;
    let mut largest_loss = 0.0_f64;

    for trade in &trades {
        let pnl = trade.profit_loss;
        if pnl > 0.0 {
            winning_trades += 1;
            gross_profit += pnl;
            largest_win = largest_win.max(pnl);
        } else if pnl < 0.0 {
            losing_trades += 1;
            gross_loss += pnl.abs();
            largest_loss = largest_loss.max(pnl.abs());
        }
    }

    let total_profit: f64 = trades.iter().map(|t| t.profit_loss).sum();
    let final_balance = initial_balance + total_profit;
    let win_rate = percentage(winning_trades, total_trades);
    let avg_win = mean_or_zero(gross_profit, winning_trades);
    let avg_loss = mean_or_zero(gross_loss, losing_trades);
    let win_probability = win_rate / 100.0;

    let equity_curve = build_equity_curve(initial_balance, &trades);
    let max_drawdown = max_drawdown_pct(&equity_curve);
    let total_return_pct = if initial_balance > 0.0 {
        total_profit / initial_balance * 100.0
    } else {
        0.0
    };

    let returns: Vec<f64> = trades
        .iter()
        .map(|t| t.profit_loss / initial_balance)
        .collect();
    let (sharpe_ratio, sortino_ratio) = risk_adjusted(&returns, annualization_factor);

    BacktestResults {
        start: window.start,
        end: window.end,
        initial_balance,
        final_balance,
        total_trades,
        winning_trades,
        losing_trades,
        win_rate,
        gross_profit,
        gross_loss,
        profit_factor: ProfitFactor::from_gross(gross_profit, gross_loss),
        total_profit,
        total_return_pct,
        max_drawdown,
        sharpe_ratio,
        sortino_ratio,
        calmar_ratio: if max_drawdown > 0.0 {
            total_return_pct / max_drawdown
        } else {
            0.0
        },
        average_trade: mean_or_zero(total_profit, total_trades),
        avg_win,
        avg_loss,
        largest_win,
        largest_loss,
        expectancy: win_probability * avg_win - (1.0 - win_probability) * avg_loss,
        avg_trade_duration_hours: mean_or_zero(
            trades.iter().map(CompletedTrade::duration_hours).sum(),
            total_trades,
        ),
        drawdown_analysis: analyze_drawdowns(&equity_curve, total_profit),
        equity_curve,
        monthly_returns: monthly_returns(&trades),
        strategy_breakdown: strategy_breakdown(&trades),
        trades,
        truncated: false,
    }
}

fn percentage(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}

fn mean_or_zero(sum: f64, count: usize) -> f64 {
    if count == 0 { 0.0 } else { sum / count as f64 }
}

/// Initial balance followed by the running balance after each trade.
pub fn build_equity_curve(initial_balance: f64, trades: &[CompletedTrade]) -> Vec<f64> {
    let mut curve = Vec::with_capacity(trades.len() + 1);
    curve.push(initial_balance);
    let mut equity = initial_balance;
    for trade in trades {
        equity += trade.profit_loss;
        curve.push(equity);
    }
    curve
}

/// Largest decline from a running peak, as a percentage of that peak.
pub fn max_drawdown_pct(equity_curve: &[f64]) -> f64 {
    let Some(&first) = equity_curve.first() else {
        return 0.0;
    };
    let mut peak = first;
    let mut max_dd = 0.0_f64;
    for &equity in equity_curve {
        if equity > peak {
            peak = equity;
        } else if peak > 0.0 {
            max_dd = max_dd.max((peak - equity) / peak * 100.0);
        }
    }
    max_dd
}

/// (Sharpe, Sortino) of per-trade returns, annualized by `sqrt(factor)`.
///
/// Both are 0 with fewer than two trades or a zero deviation.
fn risk_adjusted(returns: &[f64], annualization_factor: f64) -> (f64, f64) {
    if returns.len() < 2 {
        return (0.0, 0.0);
    }
    let n = returns.len() as f64;
    let mean = returns.iter().sum::<f64>() / n;
    let scale = annualization_factor.sqrt();

    let stdev = population_stddev(returns);
    let sharpe = if stdev > STDDEV_EPSILON {
        mean / stdev * scale
    } else {
        0.0
    };

    let downside_sq: f64 = returns.iter().filter(|&&r| r < 0.0).map(|r| r * r).sum();
    let downside_dev = (downside_sq / n).sqrt();
    let sortino = if downside_dev > STDDEV_EPSILON {
        mean / downside_dev * scale
    } else {
        0.0
    };

    (sharpe, sortino)
}

/// P&L keyed by the `YYYY-MM` of each trade's entry.
fn monthly_returns(trades: &[CompletedTrade]) -> BTreeMap<String, f64> {
    let mut months = BTreeMap::new();
    for trade in trades {
        *months
            .entry(trade.entry_time.format("%Y-%m").to_string())
            .or_insert(0.0) += trade.profit_loss;
    }
    months
}

fn strategy_breakdown(trades: &[CompletedTrade]) -> BTreeMap<String, StrategyStats> {
    let mut breakdown: BTreeMap<String, StrategyStats> = BTreeMap::new();
    for trade in trades {
        let stats = breakdown
            .entry(trade.strategy_id.clone())
            .or_insert(StrategyStats {
                trades: 0,
                winning_trades: 0,
                win_rate: 0.0,
                total_pnl: 0.0,
            });
        stats.trades += 1;
        stats.total_pnl += trade.profit_loss;
        if trade.profit_loss > 0.0 {
            stats.winning_trades += 1;
        }
    }
    for stats in breakdown.values_mut() {
        stats.win_rate = percentage(stats.winning_trades, stats.trades);
    }
    breakdown
}

fn analyze_drawdowns(equity_curve: &[f64], total_profit: f64) -> DrawdownAnalysis {
    let Some(&first) = equity_curve.first() else {
        return DrawdownAnalysis::default();
    };

    let mut analysis = DrawdownAnalysis::default();
    let mut peak = first;
    let mut current_len = 0usize;

    for &equity in equity_curve {
        if equity >= peak {
            peak = equity;
            current_len = 0;
        } else {
            if current_len == 0 {
                analysis.episodes += 1;
            }
            current_len += 1;
            analysis.longest_episode_trades = analysis.longest_episode_trades.max(current_len);
            analysis.max_drawdown_amount = analysis.max_drawdown_amount.max(peak - equity);
        }
    }

    analysis.in_drawdown_at_end = current_len > 0;
    if analysis.max_drawdown_amount > 0.0 {
        analysis.recovery_factor = total_profit / analysis.max_drawdown_amount;
    }
    analysis
}
