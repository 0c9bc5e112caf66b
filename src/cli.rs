//! CLI definition and dispatch.

use chrono::NaiveDateTime;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::adapters::csv_adapter::{self, CsvAdapter};
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::json_report::JsonReport;
use crate::adapters::trade_csv_export::TradeCsvExport;
use crate::domain::backtest::run_backtest;
use crate::domain::config_validation::{Settings, validate_config};
use crate::domain::error::BacktestError;
use crate::domain::metrics::BacktestResults;
use crate::domain::ohlcv::Bar;
use crate::domain::strategies::build_strategy;
use crate::domain::strategy::Strategy;
use crate::domain::sweep::{ParamGrid, rank_by_sharpe, run_sweep};
use crate::domain::validation::{ValidationReport, validate_out_of_sample};
use crate::ports::data_port::DataPort;
use crate::ports::report_port::ReportPort;

#[derive(Parser, Debug)]
#[command(name = "fxbacktest", about = "Bar-by-bar FX strategy backtester")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a backtest
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        /// Directory holding <SYMBOL>.csv files
        #[arg(short, long)]
        data: PathBuf,
        /// Overrides [instrument] symbol
        #[arg(long)]
        symbol: Option<String>,
        #[arg(long, value_parser = parse_cli_timestamp)]
        from: Option<NaiveDateTime>,
        #[arg(long, value_parser = parse_cli_timestamp)]
        to: Option<NaiveDateTime>,
        /// Write one CSV row per trade
        #[arg(long)]
        trades_csv: Option<PathBuf>,
        /// Write the full results as JSON
        #[arg(long)]
        json: Option<PathBuf>,
        /// Also run an in-sample / out-of-sample comparison
        #[arg(long)]
        validate_oos: bool,
    },
    /// Run the configured strategy over a grid of fast/slow periods
    Sweep {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        data: PathBuf,
        #[arg(long)]
        symbol: Option<String>,
        #[arg(long, value_parser = parse_cli_timestamp)]
        from: Option<NaiveDateTime>,
        #[arg(long, value_parser = parse_cli_timestamp)]
        to: Option<NaiveDateTime>,
        #[arg(long, value_delimiter = ',', required = true)]
        fast: Vec<usize>,
        #[arg(long, value_delimiter = ',', required = true)]
        slow: Vec<usize>,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// List symbols available in a data directory
    ListSymbols {
        #[arg(short, long)]
        data: PathBuf,
    },
}

fn parse_cli_timestamp(value: &str) -> Result<NaiveDateTime, String> {
    csv_adapter::parse_timestamp(value)
        .ok_or_else(|| format!("expected YYYY-MM-DD or 'YYYY-MM-DD HH:MM:SS', got '{value}'"))
}

/// Report files requested on the command line.
#[derive(Debug, Default)]
pub struct ReportTargets {
    pub trades_csv: Option<PathBuf>,
    pub json: Option<PathBuf>,
}

pub fn run(cli: Cli) -> ExitCode {
    let outcome = match cli.command {
        Command::Backtest {
            config,
            data,
            symbol,
            from,
            to,
            trades_csv,
            json,
            validate_oos,
        } => {
            let targets = ReportTargets { trades_csv, json };
            run_backtest_command(&config, &data, symbol.as_deref(), from, to, &targets, validate_oos)
        }
        Command::Sweep {
            config,
            data,
            symbol,
            from,
            to,
            fast,
            slow,
        } => run_sweep_command(&config, &data, symbol.as_deref(), from, to, fast, slow),
        Command::Validate { config } => run_validate(&config),
        Command::ListSymbols { data } => run_list_symbols(&data),
    };

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

pub fn load_settings(path: &Path, symbol: Option<&str>) -> Result<Settings, BacktestError> {
    eprintln!("Loading config from {}", path.display());
    let adapter = FileConfigAdapter::from_file(path)?;
    validate_config(&adapter, symbol)
}

fn load_bars(
    data_port: &dyn DataPort,
    settings: &Settings,
    from: Option<NaiveDateTime>,
    to: Option<NaiveDateTime>,
) -> Result<Vec<Bar>, BacktestError> {
    let symbol = &settings.backtest.instrument.symbol;
    let bars = data_port.fetch_bars(
        symbol,
        from.unwrap_or(NaiveDateTime::MIN),
        to.unwrap_or(NaiveDateTime::MAX),
    )?;
    eprintln!("Loaded {} bars for {}", bars.len(), symbol);
    Ok(bars)
}

fn run_backtest_command(
    config_path: &Path,
    data_dir: &Path,
    symbol: Option<&str>,
    from: Option<NaiveDateTime>,
    to: Option<NaiveDateTime>,
    targets: &ReportTargets,
    validate_oos: bool,
) -> Result<(), BacktestError> {
    let settings = load_settings(config_path, symbol)?;
    let data_port = CsvAdapter::new(data_dir.to_path_buf());

    if validate_oos {
        let (results, report) =
            run_validated_pipeline(&data_port, &settings, from, to, targets)?;
        print_summary(&results);
        print_validation(&report);
    } else {
        let results = run_backtest_pipeline(&data_port, &settings, from, to, targets)?;
        print_summary(&results);
    }
    Ok(())
}

/// Load bars, run the configured strategy, and write the requested reports.
pub fn run_backtest_pipeline(
    data_port: &dyn DataPort,
    settings: &Settings,
    from: Option<NaiveDateTime>,
    to: Option<NaiveDateTime>,
    targets: &ReportTargets,
) -> Result<BacktestResults, BacktestError> {
    let bars = load_bars(data_port, settings, from, to)?;
    let strategy = build_strategy(&settings.strategy, &settings.backtest.instrument);
    backtest_and_report(&bars, strategy.as_ref(), settings, targets)
}

/// Like [`run_backtest_pipeline`], then an out-of-sample comparison over the
/// same bars and strategy. Bars are fetched once.
pub fn run_validated_pipeline(
    data_port: &dyn DataPort,
    settings: &Settings,
    from: Option<NaiveDateTime>,
    to: Option<NaiveDateTime>,
    targets: &ReportTargets,
) -> Result<(BacktestResults, ValidationReport), BacktestError> {
    let bars = load_bars(data_port, settings, from, to)?;
    let strategy = build_strategy(&settings.strategy, &settings.backtest.instrument);
    let results = backtest_and_report(&bars, strategy.as_ref(), settings, targets)?;
    let report = validate_out_of_sample(
        &bars,
        strategy.as_ref(),
        &settings.backtest,
        settings.out_of_sample_fraction,
    )?;
    Ok((results, report))
}

fn backtest_and_report(
    bars: &[Bar],
    strategy: &(dyn Strategy + Send + Sync),
    settings: &Settings,
    targets: &ReportTargets,
) -> Result<BacktestResults, BacktestError> {
    eprintln!("Running strategy: {}", strategy.id());
    let results = run_backtest(bars, strategy, &settings.backtest, None)?;

    if let Some(path) = &targets.trades_csv {
        TradeCsvExport.write(&results, path)?;
        eprintln!("Trades written to {}", path.display());
    }
    if let Some(path) = &targets.json {
        JsonReport.write(&results, path)?;
        eprintln!("Report written to {}", path.display());
    }
    Ok(results)
}

fn run_sweep_command(
    config_path: &Path,
    data_dir: &Path,
    symbol: Option<&str>,
    from: Option<NaiveDateTime>,
    to: Option<NaiveDateTime>,
    fast_periods: Vec<usize>,
    slow_periods: Vec<usize>,
) -> Result<(), BacktestError> {
    let settings = load_settings(config_path, symbol)?;
    let data_port = CsvAdapter::new(data_dir.to_path_buf());
    let bars = load_bars(&data_port, &settings, from, to)?;

    let grid = ParamGrid {
        kind: settings.strategy.kind,
        fast_periods,
        slow_periods,
    };
    let candidates = grid.candidates(&settings.backtest);
    if candidates.is_empty() {
        return Err(BacktestError::config_invalid(
            "strategy",
            "fast_period",
            "no fast/slow combination with fast < slow",
        ));
    }
    eprintln!("Running {} candidates", candidates.len());

    let outcomes = run_sweep(&bars, &candidates, None);
    for outcome in &outcomes {
        if let Err(e) = &outcome.result {
            eprintln!("  {:<24} failed: {}", outcome.label, e);
        }
    }

    eprintln!();
    eprintln!(
        "  {:<24} {:>8} {:>9} {:>12} {:>9} {:>8}",
        "candidate", "trades", "win rate", "net profit", "max dd", "sharpe"
    );
    for (label, r) in rank_by_sharpe(&outcomes) {
        eprintln!(
            "  {:<24} {:>8} {:>8.1}% {:>12.2} {:>8.2}% {:>8.2}",
            label, r.total_trades, r.win_rate, r.total_profit, r.max_drawdown, r.sharpe_ratio
        );
    }
    Ok(())
}

fn run_validate(config_path: &Path) -> Result<(), BacktestError> {
    let settings = load_settings(config_path, None)?;
    let b = &settings.backtest;

    eprintln!("\nInstrument: {} (pip {})", b.instrument.symbol, b.instrument.pip_size);
    eprintln!(
        "Costs: spread {} slippage {} commission/lot {}",
        b.cost.spread, b.cost.slippage, b.cost.commission_per_lot
    );
    eprintln!(
        "Backtest: balance {:.2}, risk {}%, warm-up {} bars, min confidence {}",
        b.initial_balance,
        b.risk_fraction * 100.0,
        b.warmup_bars,
        b.min_confidence
    );
    eprintln!("Strategy: {}", settings.strategy.kind);
    eprintln!("\nConfiguration is valid.");
    Ok(())
}

fn run_list_symbols(data_dir: &Path) -> Result<(), BacktestError> {
    let symbols = CsvAdapter::new(data_dir.to_path_buf()).list_symbols()?;
    if symbols.is_empty() {
        eprintln!("No symbols found in {}", data_dir.display());
    } else {
        for symbol in &symbols {
            println!("{}", symbol);
        }
        eprintln!("{} symbols found", symbols.len());
    }
    Ok(())
}

pub fn print_summary(results: &BacktestResults) {
    let pf = if results.profit_factor.is_infinite() {
        "inf".to_string()
    } else {
        format!("{:.2}", results.profit_factor.as_f64())
    };

    eprintln!("\nBacktest {} .. {}", results.start, results.end);
    if results.truncated {
        eprintln!("  (cancelled before the last bar)");
    }
    eprintln!(
        "  Balance:       {:.2} -> {:.2} ({:+.2}%)",
        results.initial_balance, results.final_balance, results.total_return_pct
    );
    eprintln!(
        "  Trades:        {} ({} won, {} lost, win rate {:.1}%)",
        results.total_trades, results.winning_trades, results.losing_trades, results.win_rate
    );
    eprintln!("  Profit factor: {}", pf);
    eprintln!("  Max drawdown:  {:.2}%", results.max_drawdown);
    eprintln!(
        "  Sharpe:        {:.2}  Sortino: {:.2}  Calmar: {:.2}",
        results.sharpe_ratio, results.sortino_ratio, results.calmar_ratio
    );
    eprintln!(
        "  Expectancy:    {:.2}  Avg duration: {:.1}h",
        results.expectancy, results.avg_trade_duration_hours
    );
    if !results.monthly_returns.is_empty() {
        eprintln!("  Monthly:");
        for (month, pnl) in &results.monthly_returns {
            eprintln!("    {}  {:+.2}", month, pnl);
        }
    }
}

fn print_validation(report: &ValidationReport) {
    eprintln!("\nOut-of-sample validation");
    eprintln!(
        "  In-sample:     {} trades, win rate {:.1}%, avg {:.2}",
        report.in_sample.total_trades, report.in_sample.win_rate, report.in_sample.average_trade
    );
    eprintln!(
        "  Out-of-sample: {} trades, win rate {:.1}%, avg {:.2}",
        report.out_of_sample.total_trades,
        report.out_of_sample.win_rate,
        report.out_of_sample.average_trade
    );
    eprintln!(
        "  Degradation:   win rate {:.1}%, P&L {:.1}%",
        report.win_rate_degradation, report.pnl_degradation
    );
    eprintln!("  Verdict:       {:?}", report.verdict);
}
