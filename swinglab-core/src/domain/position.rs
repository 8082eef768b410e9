use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Direction of an open position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PositionSide {
    Long,
    Short,
}

impl PositionSide {
    /// +1 for long, -1 for short.
    pub fn sign(self) -> f64 {
        match self {
            PositionSide::Long => 1.0,
            PositionSide::Short => -1.0,
        }
    }

    pub fn opposite(self) -> Self {
        match self {
            PositionSide::Long => PositionSide::Short,
            PositionSide::Short => PositionSide::Long,
        }
    }
}

/// Observable state of the position slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PositionState {
    Flat,
    Long,
    Short,
}

impl From<Option<PositionSide>> for PositionState {
    fn from(side: Option<PositionSide>) -> Self {
        match side {
            None => PositionState::Flat,
            Some(PositionSide::Long) => PositionState::Long,
            Some(PositionSide::Short) => PositionState::Short,
        }
    }
}

/// An open position with its protective levels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub side: PositionSide,
    pub entry_index: usize,
    pub entry_time: NaiveDateTime,
    pub entry_price: f64,
    pub size: f64,
    pub stop_price: f64,
    pub target_price: f64,
    /// Commission paid on entry; settled against capital when the position closes.
    pub entry_commission: f64,
}

impl Position {
    pub fn unrealized_pnl(&self, current_price: f64) -> f64 {
        (current_price - self.entry_price) * self.size * self.side.sign()
    }

    /// True if the candle's [low, high] range reaches the stop.
    pub fn stop_touched(&self, low: f64, high: f64) -> bool {
        match self.side {
            PositionSide::Long => low <= self.stop_price,
            PositionSide::Short => high >= self.stop_price,
        }
    }

    /// True if the candle's [low, high] range reaches the target.
    pub fn target_touched(&self, low: f64, high: f64) -> bool {
        match self.side {
            PositionSide::Long => high >= self.target_price,
            PositionSide::Short => low <= self.target_price,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn position(side: PositionSide) -> Position {
        Position {
            side,
            entry_index: 0,
            entry_time: NaiveDate::from_ymd_opt(2024, 1, 2)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
            entry_price: 100.0,
            size: 10.0,
            stop_price: if side == PositionSide::Long { 95.0 } else { 105.0 },
            target_price: if side == PositionSide::Long { 110.0 } else { 90.0 },
            entry_commission: 1.0,
        }
    }

    #[test]
    fn unrealized_pnl_long_and_short() {
        assert_eq!(position(PositionSide::Long).unrealized_pnl(110.0), 100.0);
        assert_eq!(position(PositionSide::Short).unrealized_pnl(110.0), -100.0);
    }

    #[test]
    fn long_levels_touched() {
        let pos = position(PositionSide::Long);
        assert!(pos.stop_touched(94.0, 101.0));
        assert!(!pos.target_touched(94.0, 101.0));
        assert!(pos.target_touched(99.0, 110.0));
    }

    #[test]
    fn short_levels_touched() {
        let pos = position(PositionSide::Short);
        assert!(pos.stop_touched(99.0, 105.0));
        assert!(pos.target_touched(90.0, 99.0));
        assert!(!pos.stop_touched(90.0, 104.99));
    }

    #[test]
    fn state_from_side() {
        assert_eq!(PositionState::from(None), PositionState::Flat);
        assert_eq!(
            PositionState::from(Some(PositionSide::Short)),
            PositionState::Short
        );
    }
}
