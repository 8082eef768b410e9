//! Single-slot position state machine: FLAT → LONG|SHORT → FLAT.
//!
//! Stop/target monitoring uses the candle's full `[low, high]` range. When
//! both levels fall inside one candle the intrabar order is unknown, so the
//! stop is assumed to fill first (worst case for the position).

use chrono::NaiveDateTime;

use crate::domain::{Candle, ExitReason, Position, PositionSide, PositionState, Trade};

/// Protective-level percentages used when opening.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Levels {
    pub stop_loss_pct: f64,
    pub take_profit_pct: f64,
}

impl Levels {
    /// `(stop, target)` for an entry at `entry` on `side`.
    pub fn prices(&self, side: PositionSide, entry: f64) -> (f64, f64) {
        match side {
            PositionSide::Long => (
                entry * (1.0 - self.stop_loss_pct),
                entry * (1.0 + self.take_profit_pct),
            ),
            PositionSide::Short => (
                entry * (1.0 + self.stop_loss_pct),
                entry * (1.0 - self.take_profit_pct),
            ),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PositionMachine {
    position: Option<Position>,
    last_exit: Option<usize>,
}

impl PositionMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> PositionState {
        PositionState::from(self.position.as_ref().map(|p| p.side))
    }

    pub fn position(&self) -> Option<&Position> {
        self.position.as_ref()
    }

    pub fn is_flat(&self) -> bool {
        self.position.is_none()
    }

    pub fn last_exit(&self) -> Option<usize> {
        self.last_exit
    }

    /// Stop or target touched by this candle, with its fill price.
    pub fn level_exit(&self, candle: &Candle) -> Option<(ExitReason, f64)> {
        let pos = self.position.as_ref()?;
        if pos.stop_touched(candle.low, candle.high) {
            Some((ExitReason::Stop, pos.stop_price))
        } else if pos.target_touched(candle.low, candle.high) {
            Some((ExitReason::Target, pos.target_price))
        } else {
            None
        }
    }

    /// Flat and at least `gap` candles since the last exit.
    pub fn can_enter(&self, index: usize, gap: usize) -> bool {
        self.is_flat()
            && self
                .last_exit
                .map_or(true, |exit| index.saturating_sub(exit) >= gap)
    }

    /// Open at `price`. Returns `None` if a position is already open.
    #[allow(clippy::too_many_arguments)]
    pub fn open(
        &mut self,
        side: PositionSide,
        index: usize,
        timestamp: NaiveDateTime,
        price: f64,
        size: f64,
        levels: Levels,
        entry_commission: f64,
    ) -> Option<&Position> {
        if self.position.is_some() {
            return None;
        }
        let (stop_price, target_price) = levels.prices(side, price);
        self.position = Some(Position {
            side,
            entry_index: index,
            entry_time: timestamp,
            entry_price: price,
            size,
            stop_price,
            target_price,
            entry_commission,
        });
        self.position.as_ref()
    }

    /// Close at `price` and produce the trade. `exit_commission` is charged on
    /// top of the entry commission carried by the position.
    pub fn close(
        &mut self,
        index: usize,
        timestamp: NaiveDateTime,
        price: f64,
        reason: ExitReason,
        exit_commission: f64,
    ) -> Option<Trade> {
        let pos = self.position.take()?;
        self.last_exit = Some(index);

        let gross_pnl = (price - pos.entry_price) * pos.size * pos.side.sign();
        let commission = pos.entry_commission + exit_commission;
        Some(Trade {
            side: pos.side,
            entry_index: pos.entry_index,
            entry_time: pos.entry_time,
            entry_price: pos.entry_price,
            exit_index: index,
            exit_time: timestamp,
            exit_price: price,
            exit_reason: reason,
            size: pos.size,
            gross_pnl,
            commission,
            net_pnl: gross_pnl - commission,
        })
    }
}
