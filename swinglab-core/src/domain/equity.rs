use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// One mark-to-market sample of the equity curve, taken at a candle close.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EquityPoint {
    pub timestamp: NaiveDateTime,
    pub capital: f64,
}
