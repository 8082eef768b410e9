//! Domain types for SwingLab

pub mod candle;
pub mod equity;
pub mod pivot;
pub mod position;
pub mod trade;

pub use candle::{validate_series, Candle};
pub use equity::EquityPoint;
pub use pivot::{PivotKind, PivotPoint, SwingDirection, WaveSegment};
pub use position::{Position, PositionSide, PositionState};
pub use trade::{ExitReason, Trade};
