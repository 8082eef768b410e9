//! Candle-by-candle simulation loop.
//!
//! Per candle, in fixed order:
//! 1. Validate the candle against its predecessor (aborts the run on failure).
//! 2. If a position is open, check stop/target against `[low, high]`.
//! 3. Once warm, query the signal source with the causal prefix.
//! 4. Close on an opposite actionable signal (`SIGNAL_FLIP`, at close).
//! 5. Open on an actionable signal when flat and re-entry rules allow.
//! 6. On the final candle, force-close at close (`END_OF_DATA`).
//! 7. Record the mark-to-market equity sample.

use crate::domain::{Candle, EquityPoint, ExitReason, PositionSide, Trade};
use crate::error::{EngineError, SignalError};
use crate::metrics::Metrics;
use crate::signals::{CausalView, Signal, SignalSource};

use super::accounting::Account;
use super::config::EngineConfig;
use super::position_machine::{Levels, PositionMachine};
use super::state::{Action, ActionKind, RunCounters, RunResult};
use super::warmup::WarmupState;

/// Run a simulation over `candles`, querying `source` once per warm candle.
///
/// Any sub-slice of a series may be passed; indices in the result are
/// relative to the slice. Errors abort the run and no partial result is
/// returned.
pub fn run_backtest<S>(
    candles: &[Candle],
    source: &mut S,
    config: &EngineConfig,
) -> Result<RunResult, EngineError>
where
    S: SignalSource + ?Sized,
{
    config.validate()?;
    if candles.is_empty() {
        tracing::info!(source = source.name(), "no candles; empty run");
        return Ok(RunResult::empty(
            config.initial_capital,
            config.periods_per_year,
        ));
    }

    let mut sim = Simulation::new(candles.len(), config);
    let last = candles.len() - 1;

    for (t, candle) in candles.iter().enumerate() {
        let previous = t.checked_sub(1).map(|p| &candles[p]);
        candle.check_after(previous, t)?;

        // Stop / target
        if let Some((reason, price)) = sim.machine.level_exit(candle) {
            sim.close(t, candle, price, reason);
        }

        // Signal
        if sim.warmup.is_warm() {
            let signal = query(source, candles, t)?;
            sim.counters.signals_queried += 1;
            if signal.is_actionable(config.confidence_threshold) {
                sim.counters.actionable_signals += 1;
                sim.act_on_signal(t, candle, signal);
            }
        }

        // Final candle
        if t == last && !sim.machine.is_flat() {
            sim.close(t, candle, candle.close, ExitReason::EndOfData);
        }

        let equity = sim
            .account
            .mark_to_market(sim.machine.position(), candle.close);
        sim.equity_curve.push(EquityPoint {
            timestamp: candle.timestamp,
            capital: equity,
        });
        sim.warmup.process_candle();
        sim.counters.candles += 1;
    }

    Ok(sim.finish(source.name()))
}

/// Query the source and reject malformed confidences.
fn query<S>(source: &mut S, candles: &[Candle], t: usize) -> Result<Signal, SignalError>
where
    S: SignalSource + ?Sized,
{
    let signal = source.predict(CausalView::new(candles, t))?;
    if !signal.confidence.is_finite() || !(0.0..=1.0).contains(&signal.confidence) {
        return Err(SignalError::ConfidenceOutOfRange {
            index: t,
            confidence: signal.confidence,
        });
    }
    Ok(signal)
}

// ─── Mutable run state ──────────────────────────────────────────────

struct Simulation<'c> {
    config: &'c EngineConfig,
    levels: Levels,
    account: Account,
    machine: PositionMachine,
    warmup: WarmupState,
    trades: Vec<Trade>,
    equity_curve: Vec<EquityPoint>,
    actions: Vec<Action>,
    counters: RunCounters,
}

impl<'c> Simulation<'c> {
    fn new(len: usize, config: &'c EngineConfig) -> Self {
        Self {
            config,
            levels: Levels {
                stop_loss_pct: config.stop_loss_pct,
                take_profit_pct: config.take_profit_pct,
            },
            account: Account::new(config.initial_capital, config.commission_rate),
            machine: PositionMachine::new(),
            warmup: WarmupState::new(config.warmup_candles),
            trades: Vec::new(),
            equity_curve: Vec::with_capacity(len),
            actions: Vec::new(),
            counters: RunCounters::default(),
        }
    }

    fn act_on_signal(&mut self, t: usize, candle: &Candle, signal: Signal) {
        let Some(side) = signal.direction.side() else {
            return;
        };

        if let Some(open_side) = self.machine.position().map(|p| p.side) {
            if side == open_side.opposite() {
                self.close(t, candle, candle.close, ExitReason::SignalFlip);
            }
        }

        if self.config.trading_mode.allows(side)
            && self.machine.can_enter(t, self.config.reentry_gap())
        {
            self.open(t, candle, side);
        }
    }

    fn open(&mut self, t: usize, candle: &Candle, side: PositionSide) {
        let capital = self.account.capital();
        if capital <= 0.0 {
            tracing::warn!(index = t, capital, "capital exhausted; entry skipped");
            return;
        }
        let price = candle.close;
        // Notional plus entry commission stays within the committed capital.
        let size =
            capital * self.config.position_fraction / (price * (1.0 + self.config.commission_rate));
        let entry_commission = self.account.commission(size, price);

        if self
            .machine
            .open(side, t, candle.timestamp, price, size, self.levels, entry_commission)
            .is_some()
        {
            tracing::debug!(index = t, ?side, price, size, "open");
            self.actions.push(Action {
                index: t,
                timestamp: candle.timestamp,
                kind: ActionKind::Open { side, price, size },
            });
        }
    }

    fn close(&mut self, t: usize, candle: &Candle, price: f64, reason: ExitReason) {
        let Some(size) = self.machine.position().map(|p| p.size) else {
            return;
        };
        let exit_commission = self.account.commission(size, price);
        let Some(trade) = self
            .machine
            .close(t, candle.timestamp, price, reason, exit_commission)
        else {
            return;
        };

        self.account.settle(&trade);
        tracing::debug!(
            index = t,
            reason = reason.as_str(),
            price,
            net_pnl = trade.net_pnl,
            capital = self.account.capital(),
            "close"
        );
        self.actions.push(Action {
            index: t,
            timestamp: candle.timestamp,
            kind: ActionKind::Close { reason, price },
        });
        self.trades.push(trade);
    }

    fn finish(self, source_name: &str) -> RunResult {
        let metrics = Metrics::compute(
            &self.equity_curve,
            &self.trades,
            self.config.initial_capital,
            self.config.periods_per_year,
        );
        tracing::info!(
            source = source_name,
            candles = self.counters.candles,
            signals = self.counters.signals_queried,
            actionable = self.counters.actionable_signals,
            trades = self.trades.len(),
            final_capital = self.account.capital(),
            net_pnl = self.account.total_pnl(),
            commission = self.account.commission_paid(),
            total_return = metrics.total_return,
            sharpe = metrics.sharpe,
            max_drawdown = metrics.max_drawdown,
            "run complete"
        );

        RunResult {
            initial_capital: self.config.initial_capital,
            final_capital: self.account.capital(),
            trades: self.trades,
            equity_curve: self.equity_curve,
            actions: self.actions,
            metrics,
            counters: self.counters,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::PositionSide;
    use crate::engine::TradingMode;
    use crate::error::DataIntegrityError;
    use chrono::{Duration, NaiveDate};

    /// Replays a fixed per-index script.
    struct Scripted(Vec<Signal>);

    impl SignalSource for Scripted {
        fn name(&self) -> &str {
            "scripted"
        }

        fn predict(&mut self, view: CausalView<'_>) -> Result<Signal, SignalError> {
            Ok(self.0.get(view.index()).copied().unwrap_or_else(Signal::none))
        }
    }

    fn candle(i: usize, low: f64, high: f64, close: f64) -> Candle {
        Candle {
            timestamp: NaiveDate::from_ymd_opt(2024, 1, 1)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap()
                + Duration::days(i as i64),
            open: close,
            high,
            low,
            close,
            volume: 1_000.0,
        }
    }

    fn flat_candle(i: usize, price: f64) -> Candle {
        candle(i, price, price, price)
    }

    fn frictionless() -> EngineConfig {
        EngineConfig {
            commission_rate: 0.0,
            position_fraction: 1.0,
            ..EngineConfig::default()
        }
    }

    #[test]
    fn long_stopped_out_at_stop_price() {
        let candles = vec![flat_candle(0, 100.0), candle(1, 94.0, 101.0, 96.0)];
        let mut source = Scripted(vec![Signal::up(0.9)]);
        let result = run_backtest(&candles, &mut source, &frictionless()).unwrap();

        assert_eq!(result.trades.len(), 1);
        let trade = &result.trades[0];
        assert_eq!(trade.exit_reason, ExitReason::Stop);
        assert!((trade.exit_price - 95.0).abs() < 1e-10);
        assert_eq!(trade.exit_index, 1);
        assert!((result.final_capital - 9_500.0).abs() < 1e-8);
    }

    #[test]
    fn take_profit_on_short() {
        let candles = vec![flat_candle(0, 100.0), candle(1, 89.0, 100.0, 92.0)];
        let mut source = Scripted(vec![Signal::down(0.9)]);
        let result = run_backtest(&candles, &mut source, &frictionless()).unwrap();
        assert_eq!(result.trades[0].exit_reason, ExitReason::Target);
        assert!((result.trades[0].exit_price - 90.0).abs() < 1e-10);
        assert!((result.final_capital - 11_000.0).abs() < 1e-8);
    }

    #[test]
    fn opposite_signal_flips_without_same_candle_reentry() {
        let candles: Vec<_> = (0..4).map(|i| flat_candle(i, 100.0)).collect();
        let mut source = Scripted(vec![
            Signal::up(0.9),
            Signal::down(0.9),
            Signal::down(0.9),
        ]);
        let result = run_backtest(&candles, &mut source, &frictionless()).unwrap();

        let kinds: Vec<_> = result.actions.iter().map(|a| (a.index, a.kind)).collect();
        assert!(matches!(kinds[0], (0, ActionKind::Open { side: PositionSide::Long, .. })));
        assert!(matches!(
            kinds[1],
            (1, ActionKind::Close { reason: ExitReason::SignalFlip, .. })
        ));
        assert!(matches!(kinds[2], (2, ActionKind::Open { side: PositionSide::Short, .. })));
        assert!(matches!(
            kinds[3],
            (3, ActionKind::Close { reason: ExitReason::EndOfData, .. })
        ));
    }

    #[test]
    fn same_candle_reentry_when_enabled() {
        let candles: Vec<_> = (0..3).map(|i| flat_candle(i, 100.0)).collect();
        let mut source = Scripted(vec![Signal::up(0.9), Signal::down(0.9)]);
        let config = EngineConfig {
            allow_same_candle_reentry: true,
            ..frictionless()
        };
        let result = run_backtest(&candles, &mut source, &config).unwrap();
        let opens_at_1 = result
            .actions
            .iter()
            .filter(|a| a.index == 1 && matches!(a.kind, ActionKind::Open { .. }))
            .count();
        assert_eq!(opens_at_1, 1);
    }

    #[test]
    fn low_confidence_is_ignored() {
        let candles: Vec<_> = (0..3).map(|i| flat_candle(i, 100.0)).collect();
        let mut source = Scripted(vec![Signal::up(0.59), Signal::up(0.3)]);
        let result = run_backtest(&candles, &mut source, &frictionless()).unwrap();
        assert!(result.trades.is_empty());
        assert_eq!(result.counters.signals_queried, 3);
        assert_eq!(result.counters.actionable_signals, 0);
    }

    #[test]
    fn long_only_never_shorts_but_down_still_closes() {
        let candles: Vec<_> = (0..4).map(|i| flat_candle(i, 100.0)).collect();
        let mut source = Scripted(vec![
            Signal::up(0.9),
            Signal::down(0.9),
            Signal::none(),
            Signal::down(0.9),
        ]);
        let config = EngineConfig {
            trading_mode: TradingMode::LongOnly,
            ..frictionless()
        };
        let result = run_backtest(&candles, &mut source, &config).unwrap();
        assert_eq!(result.trades.len(), 1);
        assert_eq!(result.trades[0].exit_reason, ExitReason::SignalFlip);
        assert!(result
            .actions
            .iter()
            .all(|a| !matches!(a.kind, ActionKind::Open { side: PositionSide::Short, .. })));
    }

    #[test]
    fn warmup_delays_first_query() {
        let candles: Vec<_> = (0..6).map(|i| flat_candle(i, 100.0)).collect();
        let mut source = Scripted(vec![Signal::up(0.9); 6]);
        let config = EngineConfig {
            warmup_candles: 5,
            ..frictionless()
        };
        let result = run_backtest(&candles, &mut source, &config).unwrap();
        assert_eq!(result.counters.signals_queried, 1);
        assert_eq!(result.actions[0].index, 5);
    }

    #[test]
    fn cooldown_spaces_entries() {
        let candles: Vec<_> = (0..8).map(|i| flat_candle(i, 100.0)).collect();
        let mut source = Scripted(vec![
            Signal::up(0.9),
            Signal::down(0.9),
            Signal::up(0.9),
            Signal::up(0.9),
            Signal::up(0.9),
            Signal::up(0.9),
        ]);
        let config = EngineConfig {
            cooldown_candles: 3,
            trading_mode: TradingMode::LongOnly,
            ..frictionless()
        };
        let result = run_backtest(&candles, &mut source, &config).unwrap();
        let opens: Vec<usize> = result
            .actions
            .iter()
            .filter(|a| matches!(a.kind, ActionKind::Open { .. }))
            .map(|a| a.index)
            .collect();
        assert_eq!(opens, vec![0, 4]);
    }

    #[test]
    fn commission_charged_on_both_legs() {
        let candles = vec![flat_candle(0, 100.0), flat_candle(1, 110.0)];
        let mut source = Scripted(vec![Signal::up(0.9)]);
        let config = EngineConfig {
            commission_rate: 0.001,
            position_fraction: 0.5,
            take_profit_pct: 0.5,
            ..EngineConfig::default()
        };
        let result = run_backtest(&candles, &mut source, &config).unwrap();
        let trade = &result.trades[0];
        // size = 10000 * 0.5 / 100 = 50
        assert!((trade.gross_pnl - 500.0).abs() < 1e-9);
        assert!((trade.commission - (5.0 + 5.5)).abs() < 1e-9);
        assert!((result.final_capital - (10_000.0 + 500.0 - 10.5)).abs() < 1e-9);
        assert_eq!(trade.exit_reason, ExitReason::EndOfData);
    }

    #[test]
    fn equity_marks_open_position_net_of_entry_commission() {
        let candles = vec![flat_candle(0, 100.0), flat_candle(1, 102.0), flat_candle(2, 103.0)];
        let mut source = Scripted(vec![Signal::up(0.9)]);
        let config = EngineConfig {
            commission_rate: 0.001,
            position_fraction: 1.0,
            ..EngineConfig::default()
        };
        let result = run_backtest(&candles, &mut source, &config).unwrap();
        // size 100, entry commission 10
        assert!((result.equity_curve[0].capital - 9_990.0).abs() < 1e-9);
        assert!((result.equity_curve[1].capital - 10_190.0).abs() < 1e-9);
        assert_eq!(result.equity_curve.len(), 3);
    }

    #[test]
    fn empty_candles_empty_result() {
        let mut source = Scripted(vec![]);
        let result = run_backtest(&[], &mut source, &EngineConfig::default()).unwrap();
        assert!(result.trades.is_empty());
        assert!(result.equity_curve.is_empty());
        assert_eq!(result.metrics.profit_factor, crate::metrics::ProfitFactor::Undefined);
    }

    #[test]
    fn malformed_candle_aborts() {
        let mut candles = vec![flat_candle(0, 100.0), flat_candle(1, 101.0)];
        candles[1].close = f64::NAN;
        let mut source = Scripted(vec![]);
        let err = run_backtest(&candles, &mut source, &EngineConfig::default()).unwrap_err();
        assert!(matches!(
            err,
            EngineError::DataIntegrity(DataIntegrityError::NonFinitePrice { index: 1, .. })
        ));
    }

    #[test]
    fn non_increasing_timestamp_aborts() {
        let candles = vec![flat_candle(1, 100.0), flat_candle(0, 101.0)];
        let mut source = Scripted(vec![]);
        let err = run_backtest(&candles, &mut source, &EngineConfig::default()).unwrap_err();
        assert!(matches!(
            err,
            EngineError::DataIntegrity(DataIntegrityError::NonIncreasingTimestamp { .. })
        ));
    }

    #[test]
    fn out_of_range_confidence_is_fatal() {
        let candles = vec![flat_candle(0, 100.0)];
        let mut source = Scripted(vec![Signal::up(1.5)]);
        let err = run_backtest(&candles, &mut source, &EngineConfig::default()).unwrap_err();
        assert!(matches!(
            err,
            EngineError::Signal(SignalError::ConfidenceOutOfRange { index: 0, .. })
        ));
    }

    #[test]
    fn invalid_config_rejected_before_run() {
        let config = EngineConfig {
            initial_capital: -1.0,
            ..EngineConfig::default()
        };
        let mut source = Scripted(vec![]);
        let err = run_backtest(&[flat_candle(0, 1.0)], &mut source, &config).unwrap_err();
        assert!(matches!(err, EngineError::Config(_)));
    }
}
