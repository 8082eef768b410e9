//! Pivot points and the wave segments spanning consecutive pivots.

use serde::{Deserialize, Serialize};

/// Kind of turning point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PivotKind {
    Peak,
    Trough,
}

impl PivotKind {
    pub fn opposite(self) -> Self {
        match self {
            PivotKind::Peak => PivotKind::Trough,
            PivotKind::Trough => PivotKind::Peak,
        }
    }
}

/// A turning point of the price series.
///
/// `index` is the candle holding the extreme, not the candle at which the
/// reversal was detected (`confirmed_at`). Downstream segment boundaries use
/// `index`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PivotPoint {
    pub index: usize,
    pub price: f64,
    pub kind: PivotKind,
    pub confirmed: bool,
    /// Candle index at which the opposite move crossed the threshold.
    /// `None` while the pivot is still provisional.
    pub confirmed_at: Option<usize>,
}

/// Direction of the move between two consecutive confirmed pivots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SwingDirection {
    Up,
    Down,
}

/// The price run between two consecutive confirmed pivots.
///
/// Covers the half-open candle range `[start.index, end.index)`, so
/// consecutive segments tile the confirmed region without overlap.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WaveSegment {
    pub start: PivotPoint,
    pub end: PivotPoint,
    pub direction: SwingDirection,
}

impl WaveSegment {
    pub fn contains(&self, index: usize) -> bool {
        index >= self.start.index && index < self.end.index
    }

    pub fn len(&self) -> usize {
        self.end.index - self.start.index
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Relative size of the move, measured from the starting pivot.
    pub fn magnitude(&self) -> f64 {
        (self.end.price - self.start.price).abs() / self.start.price
    }
}
