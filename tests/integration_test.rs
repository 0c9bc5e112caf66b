//! Integration tests for the simulation driver.
//!
//! Tests cover:
//! - Worked scenarios: empty run, single take-profit, stop/target tie, time limit
//! - Transaction costs and commission flowing into P&L
//! - Position exclusivity and no same-bar re-entry
//! - Bundled strategies end to end
//! - Out-of-sample validation and parallel sweeps over one data set
//! - Pipeline through the data port and report adapters

mod common;

use approx::assert_relative_eq;
use common::*;
use fxbacktest::domain::backtest::{CancellationToken, run_backtest};
use fxbacktest::domain::error::BacktestError;
use fxbacktest::domain::execution::CostModel;
use fxbacktest::domain::metrics::ProfitFactor;
use fxbacktest::domain::position::ExitReason;
use fxbacktest::domain::signal::{Direction, Signal};
use fxbacktest::domain::strategies::{EmaCrossover, TrendRsi};
use std::collections::HashMap;

mod scenarios {
    use super::*;

    #[test]
    fn no_trades_gives_neutral_results() {
        let bars = constant_bars(150, 1.1);
        let strategy = scripted(HashMap::new());
        let results = run_backtest(&bars, &strategy, &test_config(100), None).unwrap();

        assert_eq!(results.total_trades, 0);
        assert_eq!(results.win_rate, 0.0);
        assert_eq!(results.profit_factor, ProfitFactor::Finite(0.0));
        assert_eq!(results.max_drawdown, 0.0);
        assert_eq!(results.equity_curve, vec![10_000.0]);
        assert_eq!(results.final_balance, 10_000.0);
    }

    #[test]
    fn single_long_take_profit() {
        let mut bars = constant_bars(10, 1.1);
        bars.push(make_bar(10, 1.1000, 1.1052, 1.1050));
        bars.push(make_bar(11, 1.1050, 1.1050, 1.1050));

        // 200-pip stop sizes 2% of 10k at 0.10 lots.
        let strategy = scripted(HashMap::from([(5, entry(Direction::Long, 1.1, 200.0, 50.0))]));
        let results = run_backtest(&bars, &strategy, &test_config(5), None).unwrap();

        assert_eq!(results.total_trades, 1);
        let trade = &results.trades[0];
        assert_relative_eq!(trade.lot_size, 0.10, epsilon = 1e-9);
        assert_eq!(trade.exit_reason, ExitReason::TakeProfit);
        assert_relative_eq!(trade.profit_loss, 50.0, epsilon = 1e-6);
        assert_relative_eq!(results.final_balance, 10_050.0, epsilon = 1e-6);
        assert_eq!(results.win_rate, 100.0);
        assert!(results.profit_factor.is_infinite());
        assert_eq!(results.sharpe_ratio, 0.0);
    }

    #[test]
    fn stop_wins_when_both_levels_touched() {
        let mut bars = constant_bars(10, 1.1);
        bars.push(make_bar(10, 1.0970, 1.1030, 1.1000));
        bars.push(make_bar(11, 1.1, 1.1, 1.1));

        let strategy = scripted(HashMap::from([(5, entry(Direction::Long, 1.1, 20.0, 20.0))]));
        let results = run_backtest(&bars, &strategy, &test_config(5), None).unwrap();

        assert_eq!(results.total_trades, 1);
        assert_eq!(results.trades[0].exit_reason, ExitReason::StopLoss);
        assert_eq!(results.trades[0].exit_time, hour(10));
    }

    #[test]
    fn time_limit_after_24_hours() {
        let bars = constant_bars(40, 1.1);
        let strategy = scripted(HashMap::from([(5, entry(Direction::Short, 1.1, 20.0, 20.0))]));
        let results = run_backtest(&bars, &strategy, &test_config(5), None).unwrap();

        assert_eq!(results.total_trades, 1);
        let trade = &results.trades[0];
        assert_eq!(trade.exit_reason, ExitReason::TimeLimit);
        // Exactly 24 hours is still within the limit.
        assert_eq!(trade.exit_time, hour(30));
        assert_relative_eq!(trade.profit_loss, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn insufficient_data_is_fatal() {
        let bars = constant_bars(100, 1.1);
        let strategy = scripted(HashMap::new());
        let err = run_backtest(&bars, &strategy, &test_config(100), None).unwrap_err();
        assert!(matches!(err, BacktestError::InsufficientData { bars: 100, minimum: 101 }));
    }
}

mod costs {
    use super::*;

    #[test]
    fn spread_and_slippage_are_paid_on_a_flat_market() {
        let bars = constant_bars(20, 1.1);
        let strategy = scripted(HashMap::from([
            (5, entry(Direction::Long, 1.1, 20.0, 20.0)),
            (7, Signal::Exit),
        ]));
        let config = fxbacktest::domain::backtest::BacktestConfig {
            cost: CostModel::default(),
            ..test_config(5)
        };
        let results = run_backtest(&bars, &strategy, &config, None).unwrap();

        let trade = &results.trades[0];
        assert_relative_eq!(trade.entry_price, 1.1 + 0.000075, epsilon = 1e-12);
        assert_relative_eq!(trade.exit_price, 1.1 - 0.000125, epsilon = 1e-12);
        // Round trip costs spread + slippage = 2 pips.
        assert_relative_eq!(trade.pips, -2.0, epsilon = 1e-6);
        assert!(trade.profit_loss < 0.0);
        assert_eq!(trade.exit_reason, ExitReason::Signal);
    }

    #[test]
    fn commission_reduces_profit() {
        let mut bars = constant_bars(10, 1.1);
        bars.push(make_bar(10, 1.1000, 1.1052, 1.1050));

        let strategy = scripted(HashMap::from([(5, entry(Direction::Long, 1.1, 200.0, 50.0))]));
        let config = fxbacktest::domain::backtest::BacktestConfig {
            cost: CostModel {
                commission_per_lot: 7.0,
                ..CostModel::zero()
            },
            ..test_config(5)
        };
        let results = run_backtest(&bars, &strategy, &config, None).unwrap();

        let trade = &results.trades[0];
        assert_relative_eq!(trade.commission, 0.7, epsilon = 1e-9);
        assert_relative_eq!(trade.profit_loss, 49.3, epsilon = 1e-6);
    }
}

mod position_exclusivity {
    use super::*;

    #[test]
    fn trades_never_overlap() {
        let bars = wavy_bars(600);
        let results = run_backtest(&bars, &always_long(), &test_config(20), None).unwrap();

        assert!(results.total_trades > 5);
        for pair in results.trades.windows(2) {
            assert!(
                pair[1].entry_time > pair[0].exit_time,
                "trade entered at {} before previous exit at {}",
                pair[1].entry_time,
                pair[0].exit_time
            );
        }
    }

    #[test]
    fn equity_curve_matches_trade_sum() {
        let bars = wavy_bars(400);
        let results = run_backtest(&bars, &always_long(), &test_config(20), None).unwrap();
        let total: f64 = results.trades.iter().map(|t| t.profit_loss).sum();

        assert_eq!(results.equity_curve.len(), results.total_trades + 1);
        assert_eq!(results.equity_curve[0], 10_000.0);
        assert_relative_eq!(
            *results.equity_curve.last().unwrap(),
            10_000.0 + total,
            epsilon = 1e-6
        );
    }

    #[test]
    fn enter_while_open_is_ignored() {
        let bars = constant_bars(20, 1.1);
        let strategy = scripted(HashMap::from([
            (5, entry(Direction::Long, 1.1, 20.0, 20.0)),
            (6, entry(Direction::Short, 1.1, 20.0, 20.0)),
        ]));
        let results = run_backtest(&bars, &strategy, &test_config(5), None).unwrap();

        assert_eq!(results.total_trades, 1);
        assert_eq!(results.trades[0].direction, Direction::Long);
        assert_eq!(results.trades[0].exit_reason, ExitReason::EndOfData);
    }
}

mod bundled_strategies {
    use super::*;

    #[test]
    fn trend_rsi_runs_end_to_end() {
        let bars = wavy_bars(1500);
        let results =
            run_backtest(&bars, &TrendRsi::default(), &Default::default(), None).unwrap();

        for trade in &results.trades {
            assert_eq!(trade.strategy_id, "trend_rsi");
            assert!(trade.confidence >= 60.0);
            assert!(trade.lot_size >= 0.01 && trade.lot_size <= 1.0);
        }
        assert_eq!(results.equity_curve.len(), results.total_trades + 1);
    }

    #[test]
    fn ema_crossover_runs_end_to_end() {
        let bars = wavy_bars(1500);
        let results =
            run_backtest(&bars, &EmaCrossover::default(), &Default::default(), None).unwrap();

        for trade in &results.trades {
            assert_eq!(trade.strategy_id, "ema_crossover");
            assert!((50.0..=95.0).contains(&trade.confidence));
        }
    }

    #[test]
    fn runs_are_deterministic() {
        let bars = wavy_bars(800);
        let a = run_backtest(&bars, &TrendRsi::default(), &Default::default(), None).unwrap();
        let b = run_backtest(&bars, &TrendRsi::default(), &Default::default(), None).unwrap();
        assert_eq!(a, b);
    }
}

mod cancellation {
    use super::*;
    use fxbacktest::domain::strategy::FnStrategy;
    use std::sync::{Arc, Barrier};

    #[test]
    fn pre_cancelled_run_on_worker_thread() {
        let bars = wavy_bars(2000);
        let token = CancellationToken::new();
        token.cancel();
        let worker_token = token.clone();

        let handle = std::thread::spawn(move || {
            run_backtest(&bars, &always_long(), &test_config(20), Some(&worker_token))
        });
        let results = handle.join().unwrap().unwrap();

        assert!(results.truncated);
        assert_eq!(results.total_trades, 0);
        assert_eq!(results.end, results.start);
    }

    #[test]
    fn cancel_mid_run_from_another_thread() {
        let bars = wavy_bars(2000);
        let expected_end = bars[100].timestamp;
        let token = CancellationToken::new();
        let worker_token = token.clone();

        // The worker parks at bar 100 until the main thread has cancelled.
        let reached = Arc::new(Barrier::new(2));
        let resume = Arc::new(Barrier::new(2));
        let (worker_reached, worker_resume) = (Arc::clone(&reached), Arc::clone(&resume));

        let handle = std::thread::spawn(move || {
            let strategy = FnStrategy::new("parking", move |history: &[Bar], index: usize| {
                match index {
                    // Wide levels keep the position open until cancellation.
                    90 => Ok(entry(Direction::Long, history[index].close, 500.0, 500.0)),
                    100 => {
                        worker_reached.wait();
                        worker_resume.wait();
                        Ok(Signal::NoAction)
                    }
                    _ => Ok(Signal::NoAction),
                }
            });
            run_backtest(&bars, &strategy, &test_config(20), Some(&worker_token))
        });

        reached.wait();
        token.cancel();
        resume.wait();
        let results = handle.join().unwrap().unwrap();

        assert!(results.truncated);
        assert_eq!(results.end, expected_end);
        assert_eq!(results.total_trades, 1);
        assert_eq!(results.trades[0].exit_reason, ExitReason::EndOfData);
        assert_eq!(results.trades[0].exit_time, expected_end);
    }
}

mod validation_and_sweep {
    use super::*;
    use fxbacktest::domain::backtest::BacktestConfig;
    use fxbacktest::domain::strategies::StrategyKind;
    use fxbacktest::domain::sweep::{ParamGrid, rank_by_sharpe, run_sweep};
    use fxbacktest::domain::validation::validate_out_of_sample;

    #[test]
    fn validation_runs_both_partitions() {
        let bars = wavy_bars(1000);
        let report =
            validate_out_of_sample(&bars, &always_long(), &test_config(20), 0.3).unwrap();

        assert_eq!(report.in_sample.start, bars[0].timestamp);
        assert_eq!(report.out_of_sample.start, bars[700].timestamp);
        assert!(report.in_sample.total_trades > 0);
        assert!(report.out_of_sample.total_trades > 0);
        for trade in &report.in_sample.trades {
            assert!(trade.exit_time < bars[700].timestamp);
        }
    }

    #[test]
    fn grid_sweep_matches_sequential_runs() {
        let bars = wavy_bars(900);
        let base = BacktestConfig::default();
        let grid = ParamGrid {
            kind: StrategyKind::EmaCrossover,
            fast_periods: vec![5, 12],
            slow_periods: vec![26, 40],
        };
        let candidates = grid.candidates(&base);
        assert_eq!(candidates.len(), 4);

        let outcomes = run_sweep(&bars, &candidates, None);
        for (outcome, candidate) in outcomes.iter().zip(&candidates) {
            let solo = run_backtest(&bars, &candidate.strategy, &candidate.config, None).unwrap();
            assert_eq!(outcome.result.as_ref().unwrap(), &solo);
        }

        let ranked = rank_by_sharpe(&outcomes);
        assert_eq!(ranked.len(), 4);
        for pair in ranked.windows(2) {
            assert!(pair[0].1.sharpe_ratio >= pair[1].1.sharpe_ratio);
        }
    }
}

mod pipeline {
    use super::*;
    use fxbacktest::cli::{ReportTargets, run_backtest_pipeline};
    use fxbacktest::domain::config_validation::validate_config;
    use fxbacktest::adapters::file_config_adapter::FileConfigAdapter;

    const INI: &str = r#"
[backtest]
initial_balance = 10000
warmup_bars = 60

[costs]
spread = 0.0001
slippage = 0

[instrument]
symbol = EURUSD

[strategy]
name = trend_rsi
"#;

    #[test]
    fn pipeline_with_mock_data_port_writes_reports() {
        let adapter = FileConfigAdapter::from_string(INI).unwrap();
        let settings = validate_config(&adapter, None).unwrap();
        let port = MockDataPort::new().with_bars("EURUSD", wavy_bars(500));

        let dir = tempfile::TempDir::new().unwrap();
        let targets = ReportTargets {
            trades_csv: Some(dir.path().join("trades.csv")),
            json: Some(dir.path().join("report.json")),
        };
        let results = run_backtest_pipeline(&port, &settings, None, None, &targets).unwrap();

        let csv = std::fs::read_to_string(dir.path().join("trades.csv")).unwrap();
        assert_eq!(csv.lines().count(), results.total_trades + 1);

        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(dir.path().join("report.json")).unwrap())
                .unwrap();
        assert_eq!(json["total_trades"], results.total_trades);
    }

    #[test]
    fn validated_pipeline_fetches_bars_once() {
        let adapter = FileConfigAdapter::from_string(INI).unwrap();
        let settings = validate_config(&adapter, None).unwrap();
        let port = MockDataPort::new().with_bars("EURUSD", wavy_bars(1000));

        let (results, report) = fxbacktest::cli::run_validated_pipeline(
            &port,
            &settings,
            None,
            None,
            &ReportTargets::default(),
        )
        .unwrap();

        assert_eq!(port.fetch_count(), 1);
        assert_eq!(results.start, report.in_sample.start);
        assert_eq!(report.out_of_sample.start, hour(700));
    }

    #[test]
    fn pipeline_propagates_data_errors() {
        let adapter = FileConfigAdapter::from_string(INI).unwrap();
        let settings = validate_config(&adapter, None).unwrap();
        let port = MockDataPort::new().with_error("EURUSD", "feed offline");

        let err = run_backtest_pipeline(&port, &settings, None, None, &ReportTargets::default())
            .unwrap_err();
        assert!(matches!(err, BacktestError::Data { .. }));
    }

    #[test]
    fn pipeline_with_too_few_bars() {
        let adapter = FileConfigAdapter::from_string(INI).unwrap();
        let settings = validate_config(&adapter, None).unwrap();
        let port = MockDataPort::new().with_bars("EURUSD", wavy_bars(30));

        let err = run_backtest_pipeline(&port, &settings, None, None, &ReportTargets::default())
            .unwrap_err();
        assert!(matches!(err, BacktestError::InsufficientData { bars: 30, minimum: 61 }));
    }
}
