//! Engine scenarios over the public API.

use chrono::{Duration, NaiveDate};
use swinglab_core::domain::{Candle, ExitReason, PositionSide};
use swinglab_core::engine::{run_backtest, ActionKind, EngineConfig, TradingMode};
use swinglab_core::error::{EngineError, SignalError};
use swinglab_core::metrics::ProfitFactor;
use swinglab_core::signals::{CausalView, PrecomputedSignals, RocMomentum, Signal, SignalSource};

/// Replays a fixed per-index script; `None` beyond the script.
struct Scripted(Vec<Signal>);

impl SignalSource for Scripted {
    fn name(&self) -> &str {
        "scripted"
    }

    fn predict(&mut self, view: CausalView<'_>) -> Result<Signal, SignalError> {
        Ok(self.0.get(view.index()).copied().unwrap_or_else(Signal::none))
    }
}

/// Fails on a given candle.
struct FailsAt(usize);

impl SignalSource for FailsAt {
    fn name(&self) -> &str {
        "fails"
    }

    fn predict(&mut self, view: CausalView<'_>) -> Result<Signal, SignalError> {
        if view.index() == self.0 {
            return Err(SignalError::SourceFailed {
                index: view.index(),
                reason: "model unavailable".into(),
            });
        }
        Ok(Signal::none())
    }
}

fn day(i: usize) -> chrono::NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 2, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
        + Duration::days(i as i64)
}

fn candle(i: usize, open: f64, high: f64, low: f64, close: f64) -> Candle {
    Candle {
        timestamp: day(i),
        open,
        high,
        low,
        close,
        volume: 5_000.0,
    }
}

fn flat(i: usize, price: f64) -> Candle {
    candle(i, price, price, price, price)
}

fn sample_candles(n: usize) -> Vec<Candle> {
    (0..n)
        .map(|i| {
            let close = 100.0 + (i as f64 * 0.3).sin() * 8.0;
            candle(i, close - 0.2, close + 1.0, close - 1.0, close)
        })
        .collect()
}

#[test]
fn long_at_100_stopped_at_95() {
    let candles = vec![flat(0, 100.0), candle(1, 99.0, 101.0, 94.0, 97.0)];
    let mut source = Scripted(vec![Signal::up(0.8)]);
    let config = EngineConfig {
        stop_loss_pct: 0.05,
        take_profit_pct: 0.10,
        ..EngineConfig::default()
    };
    let result = run_backtest(&candles, &mut source, &config).unwrap();

    assert_eq!(result.trades.len(), 1);
    let trade = &result.trades[0];
    assert_eq!(trade.side, PositionSide::Long);
    assert_eq!(trade.exit_reason, ExitReason::Stop);
    assert!((trade.exit_price - 95.0).abs() < 1e-10);
    assert!(trade.net_pnl < 0.0);
}

#[test]
fn gap_through_both_levels_is_a_stop() {
    let candles = vec![flat(0, 100.0), candle(1, 100.0, 111.0, 94.0, 105.0)];
    let mut source = Scripted(vec![Signal::up(0.8)]);
    let result = run_backtest(&candles, &mut source, &EngineConfig::default()).unwrap();
    assert_eq!(result.trades[0].exit_reason, ExitReason::Stop);
}

#[test]
fn zero_trades_metrics_are_undefined() {
    let candles = sample_candles(30);
    let mut source = Scripted(vec![]);
    let result = run_backtest(&candles, &mut source, &EngineConfig::default()).unwrap();

    assert!(result.trades.is_empty());
    assert_eq!(result.metrics.win_rate, None);
    assert_eq!(result.metrics.profit_factor, ProfitFactor::Undefined);
    assert_eq!(result.equity_curve.len(), 30);
    assert!(result
        .equity_curve
        .iter()
        .all(|p| p.capital == result.initial_capital));
}

#[test]
fn capital_identity_holds() {
    let candles = sample_candles(200);
    let mut source = RocMomentum::new(3, 0.5).unwrap();
    let config = EngineConfig {
        confidence_threshold: 0.05,
        ..EngineConfig::default()
    };
    let result = run_backtest(&candles, &mut source, &config).unwrap();

    assert!(!result.trades.is_empty());
    let net: f64 = result.trades.iter().map(|t| t.net_pnl).sum();
    assert!((result.final_capital - (result.initial_capital + net)).abs() < 1e-6);
    let last_equity = result.equity_curve.last().unwrap().capital;
    assert!((last_equity - result.final_capital).abs() < 1e-6);
    assert!((result.metrics.final_capital - result.final_capital).abs() < 1e-6);
}

#[test]
fn every_trade_has_matching_open_and_close_actions() {
    let candles = sample_candles(150);
    let mut source = RocMomentum::new(4, 0.2).unwrap();
    let config = EngineConfig {
        confidence_threshold: 0.02,
        ..EngineConfig::default()
    };
    let result = run_backtest(&candles, &mut source, &config).unwrap();

    let opens = result
        .actions
        .iter()
        .filter(|a| matches!(a.kind, ActionKind::Open { .. }))
        .count();
    let closes = result
        .actions
        .iter()
        .filter(|a| matches!(a.kind, ActionKind::Close { .. }))
        .count();
    assert_eq!(opens, result.trades.len());
    assert_eq!(closes, result.trades.len());
    for trade in &result.trades {
        assert!(trade.exit_index >= trade.entry_index);
    }
}

#[test]
fn short_only_mode_opens_shorts_only() {
    let candles = sample_candles(120);
    let mut source = RocMomentum::new(3, 0.3).unwrap();
    let config = EngineConfig {
        trading_mode: TradingMode::ShortOnly,
        confidence_threshold: 0.02,
        ..EngineConfig::default()
    };
    let result = run_backtest(&candles, &mut source, &config).unwrap();
    assert!(!result.trades.is_empty());
    assert!(result.trades.iter().all(|t| t.side == PositionSide::Short));
}

#[test]
fn precomputed_signals_drive_the_run() {
    let candles: Vec<_> = (0..5).map(|i| flat(i, 100.0 + i as f64)).collect();
    let mut source: PrecomputedSignals = candles
        .iter()
        .enumerate()
        .map(|(i, c)| {
            let s = if i == 1 { Signal::up(0.9) } else { Signal::none() };
            (c.timestamp, s)
        })
        .collect();
    let result = run_backtest(&candles, &mut source, &EngineConfig::default()).unwrap();
    assert_eq!(result.trades.len(), 1);
    assert_eq!(result.trades[0].entry_index, 1);
    assert_eq!(result.trades[0].exit_reason, ExitReason::EndOfData);
}

#[test]
fn missing_precomputed_signal_is_fatal() {
    let candles: Vec<_> = (0..3).map(|i| flat(i, 100.0)).collect();
    let mut source: PrecomputedSignals = [(candles[0].timestamp, Signal::none())]
        .into_iter()
        .collect();
    let err = run_backtest(&candles, &mut source, &EngineConfig::default()).unwrap_err();
    assert!(matches!(err, EngineError::Signal(SignalError::Missing { .. })));
}

#[test]
fn source_failure_aborts_without_partial_result() {
    let candles = sample_candles(10);
    let mut source = FailsAt(4);
    let err = run_backtest(&candles, &mut source, &EngineConfig::default()).unwrap_err();
    assert!(matches!(
        err,
        EngineError::Signal(SignalError::SourceFailed { index: 4, .. })
    ));
}

#[test]
fn sub_slice_runs_are_independent() {
    let candles = sample_candles(100);
    let mut source = RocMomentum::new(3, 0.3).unwrap();
    let config = EngineConfig {
        confidence_threshold: 0.02,
        ..EngineConfig::default()
    };
    let tail = run_backtest(&candles[50..], &mut source, &config).unwrap();
    assert_eq!(tail.equity_curve.len(), 50);
    assert_eq!(tail.equity_curve[0].timestamp, candles[50].timestamp);
    assert!(tail.actions.iter().all(|a| a.index < 50));
}

#[test]
fn full_allocation_covers_entry_commission() {
    let candles: Vec<Candle> = (0..4).map(|i| flat(i, 50.0)).collect();
    let mut source = Scripted(vec![Signal::up(0.9)]);
    let config = EngineConfig {
        position_fraction: 1.0,
        commission_rate: 0.01,
        ..EngineConfig::default()
    };
    let result = run_backtest(&candles, &mut source, &config).unwrap();

    let trade = &result.trades[0];
    let notional = trade.size * trade.entry_price;
    let entry_commission = notional * config.commission_rate;
    assert!((notional + entry_commission - config.initial_capital).abs() < 1e-6);
    assert!(result.equity_curve.iter().all(|p| p.capital > 0.0));
}
