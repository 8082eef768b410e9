//! Performance metrics: pure functions that reduce a ledger and equity curve.
//!
//! Every metric is a pure function: equity values and/or trades in, scalar out.
//! Periodic returns are taken over `[initial_capital, e_0, e_1, ..]` so the
//! first candle's mark-to-market move is counted.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::domain::{EquityPoint, ExitReason, Trade};

/// Gross profit over gross loss, with its edge cases made explicit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfitFactor {
    /// No trades, or only breakeven trades.
    Undefined,
    /// Profitable trades and no losing trades.
    Infinite,
    Finite(f64),
}

impl ProfitFactor {
    pub fn value(&self) -> Option<f64> {
        match *self {
            ProfitFactor::Undefined => None,
            ProfitFactor::Infinite => Some(f64::INFINITY),
            ProfitFactor::Finite(v) => Some(v),
        }
    }
}

impl fmt::Display for ProfitFactor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProfitFactor::Undefined => f.write_str("undefined"),
            ProfitFactor::Infinite => f.write_str("inf"),
            ProfitFactor::Finite(v) => write!(f, "{v}"),
        }
    }
}

/// Count of closed trades per exit reason.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExitBreakdown {
    pub stop: usize,
    pub target: usize,
    pub signal_flip: usize,
    pub end_of_data: usize,
}

impl ExitBreakdown {
    pub fn from_trades(trades: &[Trade]) -> Self {
        let mut breakdown = Self::default();
        for trade in trades {
            match trade.exit_reason {
                ExitReason::Stop => breakdown.stop += 1,
                ExitReason::Target => breakdown.target += 1,
                ExitReason::SignalFlip => breakdown.signal_flip += 1,
                ExitReason::EndOfData => breakdown.end_of_data += 1,
            }
        }
        breakdown
    }
}

/// Aggregate performance metrics for a single run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    pub initial_capital: f64,
    pub final_capital: f64,
    pub total_return: f64,
    pub sharpe: f64,
    pub sortino: f64,
    /// Positive fraction of the running peak (0.15 = 15% drawdown).
    pub max_drawdown: f64,
    pub trade_count: usize,
    pub winning_trades: usize,
    pub losing_trades: usize,
    /// `None` with no trades.
    pub win_rate: Option<f64>,
    pub profit_factor: ProfitFactor,
    /// Mean net pnl of winning trades.
    pub avg_win: Option<f64>,
    /// Mean net pnl of losing trades (negative).
    pub avg_loss: Option<f64>,
    pub total_commission: f64,
    pub max_consecutive_losses: usize,
    pub exit_breakdown: ExitBreakdown,
}

impl Metrics {
    pub fn compute(
        equity_curve: &[EquityPoint],
        trades: &[Trade],
        initial_capital: f64,
        periods_per_year: f64,
    ) -> Self {
        let equity: Vec<f64> = equity_curve.iter().map(|p| p.capital).collect();
        let final_capital = equity.last().copied().unwrap_or(initial_capital);
        let returns = periodic_returns(initial_capital, &equity);

        Self {
            initial_capital,
            final_capital,
            total_return: total_return(initial_capital, final_capital),
            sharpe: sharpe_ratio(&returns, periods_per_year),
            sortino: sortino_ratio(&returns, periods_per_year),
            max_drawdown: max_drawdown(initial_capital, &equity),
            trade_count: trades.len(),
            winning_trades: trades.iter().filter(|t| t.is_winner()).count(),
            losing_trades: trades.iter().filter(|t| is_loser(t)).count(),
            win_rate: win_rate(trades),
            profit_factor: profit_factor(trades),
            avg_win: mean_of(trades.iter().filter(|t| t.is_winner()).map(|t| t.net_pnl)),
            avg_loss: mean_of(trades.iter().filter(|t| is_loser(t)).map(|t| t.net_pnl)),
            total_commission: trades.iter().map(|t| t.commission).sum(),
            max_consecutive_losses: max_consecutive_losses(trades),
            exit_breakdown: ExitBreakdown::from_trades(trades),
        }
    }

    /// Flat `key -> value` rendering for CSV/report export. Undefined values
    /// render as `undefined`.
    pub fn to_flat_map(&self) -> BTreeMap<String, String> {
        fn opt(v: Option<f64>) -> String {
            v.map_or_else(|| "undefined".to_string(), |v| v.to_string())
        }

        let mut m = BTreeMap::new();
        m.insert("initial_capital".into(), self.initial_capital.to_string());
        m.insert("final_capital".into(), self.final_capital.to_string());
        m.insert("total_return".into(), self.total_return.to_string());
        m.insert("sharpe".into(), self.sharpe.to_string());
        m.insert("sortino".into(), self.sortino.to_string());
        m.insert("max_drawdown".into(), self.max_drawdown.to_string());
        m.insert("trade_count".into(), self.trade_count.to_string());
        m.insert("winning_trades".into(), self.winning_trades.to_string());
        m.insert("losing_trades".into(), self.losing_trades.to_string());
        m.insert("win_rate".into(), opt(self.win_rate));
        m.insert("profit_factor".into(), self.profit_factor.to_string());
        m.insert("avg_win".into(), opt(self.avg_win));
        m.insert("avg_loss".into(), opt(self.avg_loss));
        m.insert("total_commission".into(), self.total_commission.to_string());
        m.insert(
            "max_consecutive_losses".into(),
            self.max_consecutive_losses.to_string(),
        );
        m.insert("exits_stop".into(), self.exit_breakdown.stop.to_string());
        m.insert("exits_target".into(), self.exit_breakdown.target.to_string());
        m.insert(
            "exits_signal_flip".into(),
            self.exit_breakdown.signal_flip.to_string(),
        );
        m.insert(
            "exits_end_of_data".into(),
            self.exit_breakdown.end_of_data.to_string(),
        );
        m
    }
}

// ─── Individual metric functions ────────────────────────────────────

/// Total return as a fraction: (final - initial) / initial.
pub fn total_return(initial_capital: f64, final_capital: f64) -> f64 {
    if initial_capital <= 0.0 {
        return 0.0;
    }
    (final_capital - initial_capital) / initial_capital
}

/// Simple returns between consecutive samples, seeded with `initial`.
pub fn periodic_returns(initial: f64, equity: &[f64]) -> Vec<f64> {
    let mut previous = initial;
    let mut returns = Vec::with_capacity(equity.len());
    for &eq in equity {
        returns.push(if previous > 0.0 {
            (eq - previous) / previous
        } else {
            0.0
        });
        previous = eq;
    }
    returns
}

/// Annualized Sharpe ratio: mean / std * sqrt(periods_per_year).
///
/// Returns 0.0 with fewer than 2 returns or zero variance.
pub fn sharpe_ratio(returns: &[f64], periods_per_year: f64) -> f64 {
    if returns.len() < 2 {
        return 0.0;
    }
    let std = std_dev(returns);
    if std < 1e-15 {
        return 0.0;
    }
    (mean_f64(returns) / std) * periods_per_year.sqrt()
}

/// Annualized Sortino ratio. The denominator is the standard deviation of
/// the negative returns only.
///
/// Returns 0.0 with fewer than 2 negative returns or zero downside spread.
pub fn sortino_ratio(returns: &[f64], periods_per_year: f64) -> f64 {
    let negatives: Vec<f64> = returns.iter().copied().filter(|&r| r < 0.0).collect();
    if negatives.len() < 2 {
        return 0.0;
    }
    let downside_std = std_dev(&negatives);
    if downside_std < 1e-15 {
        return 0.0;
    }
    (mean_f64(returns) / downside_std) * periods_per_year.sqrt()
}

/// Maximum drawdown as a positive fraction of the running peak. The peak
/// starts at `initial`.
pub fn max_drawdown(initial: f64, equity: &[f64]) -> f64 {
    let mut peak = initial;
    let mut max_dd = 0.0_f64;
    for &eq in equity {
        if eq > peak {
            peak = eq;
        }
        if peak > 0.0 {
            max_dd = max_dd.max((peak - eq) / peak);
        }
    }
    max_dd
}

/// Fraction of trades with positive net pnl. `None` with no trades.
pub fn win_rate(trades: &[Trade]) -> Option<f64> {
    if trades.is_empty() {
        return None;
    }
    let winners = trades.iter().filter(|t| t.is_winner()).count();
    Some(winners as f64 / trades.len() as f64)
}

/// Gross profit / gross loss over net trade pnl.
pub fn profit_factor(trades: &[Trade]) -> ProfitFactor {
    let gross_profit: f64 = trades
        .iter()
        .filter(|t| t.net_pnl > 0.0)
        .map(|t| t.net_pnl)
        .sum();
    let gross_loss: f64 = trades
        .iter()
        .filter(|t| t.net_pnl < 0.0)
        .map(|t| t.net_pnl.abs())
        .sum();

    if gross_loss > 0.0 {
        ProfitFactor::Finite(gross_profit / gross_loss)
    } else if gross_profit > 0.0 {
        ProfitFactor::Infinite
    } else {
        ProfitFactor::Undefined
    }
}

/// Longest run of losing trades. Breakeven trades end a streak.
pub fn max_consecutive_losses(trades: &[Trade]) -> usize {
    let mut max_streak = 0;
    let mut current = 0;
    for trade in trades {
        if is_loser(trade) {
            current += 1;
            max_streak = max_streak.max(current);
        } else {
            current = 0;
        }
    }
    max_streak
}

// ─── Helpers ────────────────────────────────────────────────────────

fn is_loser(trade: &Trade) -> bool {
    trade.net_pnl < 0.0
}

fn mean_of(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, n) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    (n > 0).then(|| sum / n as f64)
}

pub(crate) fn mean_f64(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation (n - 1).
pub(crate) fn std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let mean = mean_f64(values);
    let variance =
        values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    variance.sqrt()
}
