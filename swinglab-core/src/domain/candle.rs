//! Candle: the fundamental market data unit.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::error::DataIntegrityError;

/// OHLCV candle for a single instrument and timeframe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub timestamp: NaiveDateTime,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Candle {
    /// Returns true if any OHLC field is NaN or infinite.
    pub fn has_non_finite_price(&self) -> bool {
        !(self.open.is_finite()
            && self.high.is_finite()
            && self.low.is_finite()
            && self.close.is_finite())
    }

    /// Basic OHLCV sanity check: finite positive prices, open/close inside [low, high].
    pub fn is_sane(&self) -> bool {
        self.check(0).is_ok()
    }

    /// Validate this candle in isolation. `index` is only used for error reporting.
    pub fn check(&self, index: usize) -> Result<(), DataIntegrityError> {
        for (field, value) in [
            ("open", self.open),
            ("high", self.high),
            ("low", self.low),
            ("close", self.close),
        ] {
            if !value.is_finite() {
                return Err(DataIntegrityError::NonFinitePrice {
                    index,
                    field,
                    value,
                });
            }
            if value <= 0.0 {
                return Err(DataIntegrityError::NonPositivePrice {
                    index,
                    field,
                    value,
                });
            }
        }

        if self.high < self.low
            || self.high < self.open
            || self.high < self.close
            || self.low > self.open
            || self.low > self.close
        {
            return Err(DataIntegrityError::InconsistentRange {
                index,
                open: self.open,
                high: self.high,
                low: self.low,
                close: self.close,
            });
        }

        if !self.volume.is_finite() || self.volume < 0.0 {
            return Err(DataIntegrityError::InvalidVolume {
                index,
                value: self.volume,
            });
        }

        Ok(())
    }

    /// Validate this candle as the successor of `previous` in a series.
    pub fn check_after(
        &self,
        previous: Option<&Candle>,
        index: usize,
    ) -> Result<(), DataIntegrityError> {
        self.check(index)?;
        if let Some(prev) = previous {
            if self.timestamp <= prev.timestamp {
                return Err(DataIntegrityError::NonIncreasingTimestamp {
                    index,
                    previous: prev.timestamp,
                    current: self.timestamp,
                });
            }
        }
        Ok(())
    }
}

/// Validate a whole series: every candle sane, timestamps strictly increasing.
pub fn validate_series(candles: &[Candle]) -> Result<(), DataIntegrityError> {
    let mut previous: Option<&Candle> = None;
    for (index, candle) in candles.iter().enumerate() {
        candle.check_after(previous, index)?;
        previous = Some(candle);
    }
    Ok(())
}
