//! ZigZag pivot detector.
//!
//! Turns an ordered price series into confirmed turning points. A candidate
//! extreme is carried forward while price keeps extending it; once price
//! retraces by at least the deviation threshold (relative to the extreme),
//! the extreme is confirmed at the candle where it occurred and the trend
//! flips.
//!
//! - The starting extreme that establishes the first trend is never emitted.
//! - The last, still-extending extreme is reported as `provisional` and never
//!   feeds labels.

use serde::{Deserialize, Serialize};

use crate::domain::{validate_series, Candle, PivotKind, PivotPoint};
use crate::error::{ConfigError, DataIntegrityError};

/// Which candle fields feed the detector.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceSource {
    /// Closing prices only.
    #[default]
    Close,
    /// Highs drive peak tracking, lows drive trough tracking.
    HighLow,
}

/// Result of one detector pass.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ZigZagOutput {
    /// Confirmed pivots, strictly alternating in kind.
    pub pivots: Vec<PivotPoint>,
    /// Current candidate extreme at end of data. Diagnostics only.
    pub provisional: Option<PivotPoint>,
}

/// Percentage-deviation ZigZag.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZigZag {
    deviation: f64,
    source: PriceSource,
}

impl ZigZag {
    /// `deviation` is a fraction in (0, 1), e.g. 0.03 for 3%.
    pub fn new(deviation: f64) -> Result<Self, ConfigError> {
        if !deviation.is_finite() || deviation <= 0.0 || deviation >= 1.0 {
            return Err(ConfigError::InvalidThreshold(deviation));
        }
        Ok(Self {
            deviation,
            source: PriceSource::Close,
        })
    }

    pub fn with_price_source(mut self, source: PriceSource) -> Self {
        self.source = source;
        self
    }

    pub fn deviation(&self) -> f64 {
        self.deviation
    }

    pub fn price_source(&self) -> PriceSource {
        self.source
    }

    /// Detect pivots over a plain price series.
    pub fn detect(&self, prices: &[f64]) -> Result<ZigZagOutput, DataIntegrityError> {
        for (index, &value) in prices.iter().enumerate() {
            if !value.is_finite() || value <= 0.0 {
                return Err(DataIntegrityError::InvalidPrice { index, value });
            }
        }
        Ok(self.scan(prices.len(), |i| prices[i], |i| prices[i]))
    }

    /// Detect pivots over candles, reading the fields selected by the price source.
    pub fn detect_candles(&self, candles: &[Candle]) -> Result<ZigZagOutput, DataIntegrityError> {
        validate_series(candles)?;
        let output = match self.source {
            PriceSource::Close => self.scan(candles.len(), |i| candles[i].close, |i| candles[i].close),
            PriceSource::HighLow => {
                self.scan(candles.len(), |i| candles[i].high, |i| candles[i].low)
            }
        };
        Ok(output)
    }

    fn scan(&self, len: usize, high: impl Fn(usize) -> f64, low: impl Fn(usize) -> f64) -> ZigZagOutput {
        let mut output = ZigZagOutput::default();
        if len == 0 {
            return output;
        }

        let mut tracker = Tracker::new(self.deviation, high(0), low(0));
        for i in 1..len {
            if let Some(pivot) = tracker.step(i, high(i), low(i)) {
                output.pivots.push(pivot);
            }
        }
        output.provisional = tracker.provisional();

        tracing::debug!(
            deviation = self.deviation,
            candles = len,
            pivots = output.pivots.len(),
            "zigzag scan complete"
        );
        output
    }
}

// ─── Tracker ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
enum Trend {
    /// No direction established yet: running extremes since the first price.
    Unknown {
        max_index: usize,
        max: f64,
        min_index: usize,
        min: f64,
    },
    Up { peak_index: usize, peak: f64 },
    Down { trough_index: usize, trough: f64 },
}

#[derive(Debug)]
struct Tracker {
    deviation: f64,
    trend: Trend,
}

impl Tracker {
    fn new(deviation: f64, high: f64, low: f64) -> Self {
        Self {
            deviation,
            trend: Trend::Unknown {
                max_index: 0,
                max: high,
                min_index: 0,
                min: low,
            },
        }
    }

    /// Feed candle `i`. Returns a pivot if this candle confirmed one.
    fn step(&mut self, i: usize, high: f64, low: f64) -> Option<PivotPoint> {
        let d = self.deviation;
        match self.trend {
            Trend::Unknown {
                max_index,
                max,
                min_index,
                min,
            } => {
                let rise = (high - min) / min;
                let fall = (max - low) / max;
                let rise_hit = rise >= d;
                let fall_hit = fall >= d;

                if rise_hit && (!fall_hit || rise >= fall) {
                    self.trend = Trend::Up {
                        peak_index: i,
                        peak: high,
                    };
                } else if fall_hit {
                    self.trend = Trend::Down {
                        trough_index: i,
                        trough: low,
                    };
                } else {
                    let (max_index, max) = if high > max { (i, high) } else { (max_index, max) };
                    let (min_index, min) = if low < min { (i, low) } else { (min_index, min) };
                    self.trend = Trend::Unknown {
                        max_index,
                        max,
                        min_index,
                        min,
                    };
                }
                None
            }
            Trend::Up { peak_index, peak } => {
                if high > peak {
                    self.trend = Trend::Up {
                        peak_index: i,
                        peak: high,
                    };
                    None
                } else if (peak - low) / peak >= d {
                    self.trend = Trend::Down {
                        trough_index: i,
                        trough: low,
                    };
                    Some(confirmed(peak_index, peak, PivotKind::Peak, i))
                } else {
                    None
                }
            }
            Trend::Down {
                trough_index,
                trough,
            } => {
                if low < trough {
                    self.trend = Trend::Down {
                        trough_index: i,
                        trough: low,
                    };
                    None
                } else if (high - trough) / trough >= d {
                    self.trend = Trend::Up {
                        peak_index: i,
                        peak: high,
                    };
                    Some(confirmed(trough_index, trough, PivotKind::Trough, i))
                } else {
                    None
                }
            }
        }
    }

    fn provisional(&self) -> Option<PivotPoint> {
        let (index, price, kind) = match self.trend {
            Trend::Unknown { .. } => return None,
            Trend::Up { peak_index, peak } => (peak_index, peak, PivotKind::Peak),
            Trend::Down {
                trough_index,
                trough,
            } => (trough_index, trough, PivotKind::Trough),
        };
        Some(PivotPoint {
            index,
            price,
            kind,
            confirmed: false,
            confirmed_at: None,
        })
    }
}

fn confirmed(index: usize, price: f64, kind: PivotKind, at: usize) -> PivotPoint {
    PivotPoint {
        index,
        price,
        kind,
        confirmed: true,
        confirmed_at: Some(at),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn zz(d: f64) -> ZigZag {
        ZigZag::new(d).unwrap()
    }

    #[test]
    fn reference_series_pivots() {
        let closes = [100.0, 103.0, 106.0, 110.0, 107.0, 103.0, 100.0, 104.0, 108.0, 112.0];
        let out = zz(0.03).detect(&closes).unwrap();
        assert_eq!(out.pivots.len(), 2);

        assert_eq!(out.pivots[0].index, 3);
        assert_eq!(out.pivots[0].price, 110.0);
        assert_eq!(out.pivots[0].kind, PivotKind::Peak);
        assert_eq!(out.pivots[0].confirmed_at, Some(5));

        assert_eq!(out.pivots[1].index, 6);
        assert_eq!(out.pivots[1].price, 100.0);
        assert_eq!(out.pivots[1].kind, PivotKind::Trough);
        assert_eq!(out.pivots[1].confirmed_at, Some(7));

        let prov = out.provisional.unwrap();
        assert_eq!(prov.index, 9);
        assert!(!prov.confirmed);
    }

    #[test]
    fn rejects_bad_thresholds() {
        for d in [0.0, -0.1, 1.0, 1.5, f64::NAN, f64::INFINITY] {
            assert!(ZigZag::new(d).is_err(), "threshold {d} accepted");
        }
    }

    #[test]
    fn flat_and_short_series_have_no_pivots() {
        assert!(zz(0.03).detect(&[]).unwrap().pivots.is_empty());
        assert!(zz(0.03).detect(&[100.0]).unwrap().pivots.is_empty());
        let flat = vec![50.0; 100];
        let out = zz(0.03).detect(&flat).unwrap();
        assert!(out.pivots.is_empty());
        assert!(out.provisional.is_none());
    }

    #[test]
    fn monotonic_rise_emits_nothing_confirmed() {
        let prices: Vec<f64> = (0..50).map(|i| 100.0 + i as f64).collect();
        let out = zz(0.03).detect(&prices).unwrap();
        assert!(out.pivots.is_empty());
        assert_eq!(out.provisional.unwrap().index, 49);
    }

    #[test]
    fn initial_fall_starts_downtrend() {
        let prices = [100.0, 96.0, 94.0, 99.0, 95.0];
        let out = zz(0.03).detect(&prices).unwrap();
        assert_eq!(out.pivots.len(), 2);
        assert_eq!(out.pivots[0].kind, PivotKind::Trough);
        assert_eq!(out.pivots[0].index, 2);
        assert_eq!(out.pivots[1].kind, PivotKind::Peak);
        assert_eq!(out.pivots[1].index, 3);
    }

    #[test]
    fn rejects_invalid_prices() {
        let err = zz(0.03).detect(&[100.0, f64::NAN]).unwrap_err();
        assert!(matches!(err, DataIntegrityError::InvalidPrice { index: 1, .. }));
        let err = zz(0.03).detect(&[100.0, 0.0]).unwrap_err();
        assert!(matches!(err, DataIntegrityError::InvalidPrice { index: 1, .. }));
    }

    fn candle(day: u32, high: f64, low: f64, close: f64) -> Candle {
        Candle {
            timestamp: NaiveDate::from_ymd_opt(2024, 3, day)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
            open: close,
            high,
            low,
            close,
            volume: 1_000.0,
        }
    }

    #[test]
    fn high_low_source_uses_wicks() {
        // Closes never move 3%, but wicks do.
        let candles = vec![
            candle(1, 101.0, 99.0, 100.0),
            candle(2, 104.0, 100.0, 101.0),
            candle(3, 102.0, 99.0, 100.0),
            candle(4, 101.0, 100.0, 100.5),
        ];
        let by_close = zz(0.03).detect_candles(&candles).unwrap();
        assert!(by_close.pivots.is_empty());
        assert!(by_close.provisional.is_none());

        let by_wick = zz(0.03)
            .with_price_source(PriceSource::HighLow)
            .detect_candles(&candles)
            .unwrap();
        // 99 -> 104 establishes the uptrend; 104 -> 99 confirms the peak at candle 1.
        assert_eq!(by_wick.pivots.len(), 1);
        assert_eq!(by_wick.pivots[0].index, 1);
        assert_eq!(by_wick.pivots[0].price, 104.0);
    }

    #[test]
    fn wide_first_candle_prefers_larger_move() {
        let candles = vec![
            candle(1, 100.0, 100.0, 100.0),
            candle(2, 104.0, 90.0, 92.0),
        ];
        let out = zz(0.03)
            .with_price_source(PriceSource::HighLow)
            .detect_candles(&candles)
            .unwrap();
        let prov = out.provisional.unwrap();
        assert_eq!(prov.kind, PivotKind::Trough);
        assert_eq!(prov.price, 90.0);
    }

    #[test]
    fn detect_candles_rejects_bad_series() {
        let mut candles = vec![candle(1, 101.0, 99.0, 100.0), candle(2, 101.0, 99.0, 100.0)];
        candles[1].timestamp = candles[0].timestamp;
        assert!(zz(0.03).detect_candles(&candles).is_err());
    }

    #[test]
    fn price_source_serde_names() {
        let json = serde_json::to_string(&PriceSource::HighLow).unwrap();
        assert_eq!(json, "\"high_low\"");
    }
}
