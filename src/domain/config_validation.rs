//! Configuration validation.
//!
//! Reads every section through a [`ConfigPort`], checks ranges, and
//! produces the typed settings a run needs. Missing keys take the engine
//! defaults; present but malformed keys are errors.

use crate::domain::backtest::BacktestConfig;
use crate::domain::error::BacktestError;
use crate::domain::execution::CostModel;
use crate::domain::instrument::InstrumentSpec;
use crate::domain::strategies::{StrategyConfig, StrategyKind};
use crate::ports::config_port::ConfigPort;
use chrono::Duration;

pub const DEFAULT_OUT_OF_SAMPLE_FRACTION: f64 = 0.3;

/// Upper bound on `[backtest] max_holding_hours` (100 years).
pub const MAX_HOLDING_HOURS_LIMIT: f64 = 876_600.0;

/// Everything a CLI run needs, after validation.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub backtest: BacktestConfig,
    pub strategy: StrategyConfig,
    pub out_of_sample_fraction: f64,
}

/// Validate all sections. `symbol_override` replaces `[instrument] symbol`.
pub fn validate_config(
    config: &dyn ConfigPort,
    symbol_override: Option<&str>,
) -> Result<Settings, BacktestError> {
    let instrument = validate_instrument(config, symbol_override)?;
    let cost = validate_costs(config)?;
    let strategy = validate_strategy(config)?;

    let defaults = BacktestConfig::default();
    let initial_balance = read_double(config, "backtest", "initial_balance")?
        .unwrap_or(defaults.initial_balance);
    require(initial_balance > 0.0, "backtest", "initial_balance", "must be positive")?;

    let risk_fraction =
        read_double(config, "backtest", "risk_fraction")?.unwrap_or(defaults.risk_fraction);
    require(
        risk_fraction > 0.0 && risk_fraction <= 1.0,
        "backtest",
        "risk_fraction",
        "must be in (0, 1]",
    )?;

    let warmup_bars = match read_int(config, "backtest", "warmup_bars")? {
        None => defaults.warmup_bars,
        Some(n) => usize::try_from(n).map_err(|_| {
            BacktestError::config_invalid("backtest", "warmup_bars", "must be non-negative")
        })?,
    };

    let min_confidence =
        read_double(config, "backtest", "min_confidence")?.unwrap_or(defaults.min_confidence);
    require(
        (0.0..=100.0).contains(&min_confidence),
        "backtest",
        "min_confidence",
        "must be between 0 and 100",
    )?;

    let max_holding = match read_double(config, "backtest", "max_holding_hours")? {
        None => defaults.max_holding,
        Some(hours) => {
            require(hours > 0.0, "backtest", "max_holding_hours", "must be positive")?;
            require(
                hours <= MAX_HOLDING_HOURS_LIMIT,
                "backtest",
                "max_holding_hours",
                "is too large",
            )?;
            Duration::try_seconds((hours * 3600.0).round() as i64).ok_or_else(|| {
                BacktestError::config_invalid("backtest", "max_holding_hours", "is out of range")
            })?
        }
    };

    let annualization_factor = read_double(config, "backtest", "annualization_factor")?
        .unwrap_or(defaults.annualization_factor);
    require(
        annualization_factor > 0.0,
        "backtest",
        "annualization_factor",
        "must be positive",
    )?;

    let out_of_sample_fraction = read_double(config, "backtest", "out_of_sample_fraction")?
        .unwrap_or(DEFAULT_OUT_OF_SAMPLE_FRACTION);
    require(
        out_of_sample_fraction > 0.0 && out_of_sample_fraction < 1.0,
        "backtest",
        "out_of_sample_fraction",
        "must be strictly between 0 and 1",
    )?;

    Ok(Settings {
        backtest: BacktestConfig {
            initial_balance,
            risk_fraction,
            warmup_bars,
            min_confidence,
            max_holding,
            annualization_factor,
            cost,
            instrument,
        },
        strategy,
        out_of_sample_fraction,
    })
}

fn validate_costs(config: &dyn ConfigPort) -> Result<CostModel, BacktestError> {
    let defaults = CostModel::default();
    let spread = read_double(config, "costs", "spread")?.unwrap_or(defaults.spread);
    require(spread >= 0.0, "costs", "spread", "must be non-negative")?;

    let slippage = read_double(config, "costs", "slippage")?.unwrap_or(defaults.slippage);
    require(slippage >= 0.0, "costs", "slippage", "must be non-negative")?;

    let commission_per_lot = read_double(config, "costs", "commission_per_lot")?
        .unwrap_or(defaults.commission_per_lot);
    require(
        commission_per_lot >= 0.0,
        "costs",
        "commission_per_lot",
        "must be non-negative",
    )?;

    Ok(CostModel {
        spread,
        slippage,
        commission_per_lot,
    })
}

fn validate_instrument(
    config: &dyn ConfigPort,
    symbol_override: Option<&str>,
) -> Result<InstrumentSpec, BacktestError> {
    let symbol = symbol_override
        .map(str::to_string)
        .or_else(|| config.get_string("instrument", "symbol"))
        .unwrap_or_else(|| InstrumentSpec::default().symbol);
    if symbol.trim().is_empty() {
        return Err(BacktestError::ConfigMissing {
            section: "instrument".to_string(),
            key: "symbol".to_string(),
        });
    }

    let base = InstrumentSpec::for_symbol(symbol.trim());
    let spec = InstrumentSpec {
        pip_size: read_double(config, "instrument", "pip_size")?.unwrap_or(base.pip_size),
        pip_value: read_double(config, "instrument", "pip_value")?.unwrap_or(base.pip_value),
        min_lot: read_double(config, "instrument", "min_lot")?.unwrap_or(base.min_lot),
        max_lot: read_double(config, "instrument", "max_lot")?.unwrap_or(base.max_lot),
        lot_step: read_double(config, "instrument", "lot_step")?.unwrap_or(base.lot_step),
        ..base
    };

    require(spec.pip_size > 0.0, "instrument", "pip_size", "must be positive")?;
    require(spec.pip_value > 0.0, "instrument", "pip_value", "must be positive")?;
    require(spec.min_lot > 0.0, "instrument", "min_lot", "must be positive")?;
    require(
        spec.max_lot >= spec.min_lot,
        "instrument",
        "max_lot",
        "must not be below min_lot",
    )?;
    require(spec.lot_step > 0.0, "instrument", "lot_step", "must be positive")?;
    Ok(spec)
}

fn validate_strategy(config: &dyn ConfigPort) -> Result<StrategyConfig, BacktestError> {
    let kind = match config.get_string("strategy", "name") {
        None => StrategyKind::TrendRsi,
        Some(name) => name
            .parse::<StrategyKind>()
            .map_err(|reason: String| BacktestError::config_invalid("strategy", "name", reason))?,
    };

    let strategy = StrategyConfig {
        kind,
        fast_period: read_period(config, "fast_period")?,
        slow_period: read_period(config, "slow_period")?,
    };

    // Unset periods take the strategy defaults, so check the effective pair.
    let (fast, slow) = strategy.resolved_periods();
    if fast >= slow {
        return Err(BacktestError::config_invalid(
            "strategy",
            if strategy.fast_period.is_some() { "fast_period" } else { "slow_period" },
            format!("fast period {fast} must be shorter than slow period {slow}"),
        ));
    }
    Ok(strategy)
}

fn read_period(config: &dyn ConfigPort, key: &str) -> Result<Option<usize>, BacktestError> {
    match read_int(config, "strategy", key)? {
        None => Ok(None),
        Some(n) if n > 0 => Ok(Some(n as usize)),
        Some(_) => Err(BacktestError::config_invalid("strategy", key, "must be positive")),
    }
}

fn read_double(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
) -> Result<Option<f64>, BacktestError> {
    let value = config
        .get_double(section, key)
        .map_err(|reason| BacktestError::config_invalid(section, key, reason))?;
    match value {
        Some(v) if !v.is_finite() => Err(BacktestError::config_invalid(
            section,
            key,
            "must be a finite number",
        )),
        other => Ok(other),
    }
}

fn read_int(config: &dyn ConfigPort, section: &str, key: &str) -> Result<Option<i64>, BacktestError> {
    config
        .get_int(section, key)
        .map_err(|reason| BacktestError::config_invalid(section, key, reason))
}

fn require(ok: bool, section: &str, key: &str, reason: &str) -> Result<(), BacktestError> {
    if ok {
        Ok(())
    } else {
        Err(BacktestError::config_invalid(section, key, reason))
    }
}
