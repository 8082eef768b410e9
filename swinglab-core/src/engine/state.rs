//! Run result and per-candle action log.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::domain::{EquityPoint, ExitReason, PositionSide, Trade};
use crate::metrics::Metrics;

/// A decision taken by the engine at one candle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ActionKind {
    Open {
        side: PositionSide,
        price: f64,
        size: f64,
    },
    Close {
        reason: ExitReason,
        price: f64,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Action {
    pub index: usize,
    pub timestamp: NaiveDateTime,
    #[serde(flatten)]
    pub kind: ActionKind,
}

impl Action {
    pub fn is_end_of_data(&self) -> bool {
        matches!(
            self.kind,
            ActionKind::Close {
                reason: ExitReason::EndOfData,
                ..
            }
        )
    }
}

/// Run-level counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunCounters {
    pub candles: usize,
    pub signals_queried: usize,
    /// Directional signals at or above the confidence threshold.
    pub actionable_signals: usize,
}

/// Result of a complete simulation run. Immutable once returned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunResult {
    /// Completed round-trip trades, in exit order.
    pub trades: Vec<Trade>,
    /// One mark-to-market sample per candle.
    pub equity_curve: Vec<EquityPoint>,
    /// Every open/close decision, in candle order.
    pub actions: Vec<Action>,
    pub metrics: Metrics,
    pub counters: RunCounters,
    pub initial_capital: f64,
    pub final_capital: f64,
}

impl RunResult {
    /// Result of a run over zero candles.
    pub fn empty(initial_capital: f64, periods_per_year: f64) -> Self {
        Self {
            trades: Vec::new(),
            equity_curve: Vec::new(),
            actions: Vec::new(),
            metrics: Metrics::compute(&[], &[], initial_capital, periods_per_year),
            counters: RunCounters::default(),
            initial_capital,
            final_capital: initial_capital,
        }
    }
}
