use serde::{Deserialize, Serialize};

use super::segments::segments_from_pivots;
use super::table::{LabelSummary, LabelTable, TrainingSample};
use crate::domain::{validate_series, Candle, PivotPoint, WaveSegment};
use crate::error::{ConfigError, DataIntegrityError};
use crate::zigzag::{PriceSource, ZigZag};

/// A validated, complete candle sequence. The only input an offline labeler
/// accepts.
#[derive(Debug, Clone, Copy)]
pub struct CompleteSeries<'a> {
    candles: &'a [Candle],
}

impl<'a> CompleteSeries<'a> {
    pub fn new(candles: &'a [Candle]) -> Result<Self, DataIntegrityError> {
        validate_series(candles)?;
        Ok(Self { candles })
    }

    pub fn candles(&self) -> &'a [Candle] {
        self.candles
    }

    pub fn len(&self) -> usize {
        self.candles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }
}

/// Everything one labeling pass derives from a series. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelSet {
    pub pivots: Vec<PivotPoint>,
    pub provisional: Option<PivotPoint>,
    pub segments: Vec<WaveSegment>,
    pub table: LabelTable,
    pub shift: i64,
    pub samples: Vec<TrainingSample>,
    pub summary: LabelSummary,
}

/// Produces training labels from hindsight over a complete series.
pub trait OfflineLabeler: Send + Sync {
    fn label(&self, series: &CompleteSeries<'_>) -> Result<LabelSet, DataIntegrityError>;
}

/// ZigZag pivots → segments → shifted labels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SegmentLabeler {
    zigzag: ZigZag,
    shift: i64,
    neutral_band: Option<f64>,
}

impl SegmentLabeler {
    pub fn new(deviation: f64, shift: i64) -> Result<Self, ConfigError> {
        Ok(Self {
            zigzag: ZigZag::new(deviation)?,
            shift,
            neutral_band: None,
        })
    }

    pub fn with_price_source(mut self, source: PriceSource) -> Self {
        self.zigzag = self.zigzag.with_price_source(source);
        self
    }

    /// Segments moving less than `band` (fraction) are labeled neutral.
    pub fn with_neutral_band(mut self, band: f64) -> Result<Self, ConfigError> {
        if !band.is_finite() || band <= 0.0 || band >= 1.0 {
            return Err(ConfigError::out_of_range("neutral_band", band, "(0, 1)"));
        }
        self.neutral_band = Some(band);
        Ok(self)
    }

    pub fn shift(&self) -> i64 {
        self.shift
    }
}

impl OfflineLabeler for SegmentLabeler {
    fn label(&self, series: &CompleteSeries<'_>) -> Result<LabelSet, DataIntegrityError> {
        let candles = series.candles();
        let detected = self.zigzag.detect_candles(candles)?;
        let segments = segments_from_pivots(&detected.pivots);
        let table = LabelTable::from_segments(candles.len(), &segments, self.neutral_band);

        let timestamps: Vec<_> = candles.iter().map(|c| c.timestamp).collect();
        let samples = if segments.is_empty() {
            tracing::warn!(
                candles = candles.len(),
                pivots = detected.pivots.len(),
                deviation = self.zigzag.deviation(),
                "fewer than two confirmed pivots; no training samples"
            );
            Vec::new()
        } else {
            table.training_samples(&timestamps, self.shift)
        };
        let summary = table.summary(&samples);

        tracing::info!(
            candles = summary.candles,
            pivots = detected.pivots.len(),
            impulse_up = summary.impulse_up,
            impulse_down = summary.impulse_down,
            neutral = summary.neutral,
            unknown = summary.unknown,
            samples = summary.samples,
            dropped = summary.dropped,
            shift = self.shift,
            "labeling complete"
        );

        Ok(LabelSet {
            pivots: detected.pivots,
            provisional: detected.provisional,
            segments,
            table,
            shift: self.shift,
            samples,
            summary,
        })
    }
}
