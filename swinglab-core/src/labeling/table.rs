use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::domain::{SwingDirection, WaveSegment};

/// Per-candle swing class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Label {
    ImpulseUp,
    ImpulseDown,
    Neutral,
}

impl Label {
    pub fn as_str(self) -> &'static str {
        match self {
            Label::ImpulseUp => "IMPULSE_UP",
            Label::ImpulseDown => "IMPULSE_DOWN",
            Label::Neutral => "NEUTRAL",
        }
    }
}

/// One labeled training sample: features observed at `index`, class taken
/// from `index + shift`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrainingSample {
    pub index: usize,
    pub timestamp: NaiveDateTime,
    pub label: Label,
}

/// Unshifted per-candle classes. `None` marks candles outside any confirmed
/// segment (before the first pivot or in the open tail).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LabelTable {
    labels: Vec<Option<Label>>,
}

impl LabelTable {
    /// Classify `len` candles from the confirmed segments.
    ///
    /// With `neutral_band = Some(b)`, a segment whose magnitude is below `b`
    /// is labeled neutral.
    pub fn from_segments(len: usize, segments: &[WaveSegment], neutral_band: Option<f64>) -> Self {
        let mut labels = vec![None; len];
        for seg in segments {
            let class = match (neutral_band, seg.direction) {
                (Some(band), _) if seg.magnitude() < band => Label::Neutral,
                (_, SwingDirection::Up) => Label::ImpulseUp,
                (_, SwingDirection::Down) => Label::ImpulseDown,
            };
            let end = seg.end.index.min(len);
            for slot in labels.iter_mut().take(end).skip(seg.start.index) {
                *slot = Some(class);
            }
        }
        Self { labels }
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<Label> {
        self.labels.get(index).copied().flatten()
    }

    pub fn as_slice(&self) -> &[Option<Label>] {
        &self.labels
    }

    /// Class for the sample observed at `index` under a signed shift.
    /// `None` when the shifted index is out of range or unknown.
    pub fn shifted(&self, index: usize, shift: i64) -> Option<Label> {
        let target = i64::try_from(index).ok()?.checked_add(shift)?;
        let target = usize::try_from(target).ok()?;
        self.get(target)
    }

    /// Emit training samples under `shift`, dropping unlabelable candles.
    pub fn training_samples(&self, timestamps: &[NaiveDateTime], shift: i64) -> Vec<TrainingSample> {
        timestamps
            .iter()
            .enumerate()
            .take(self.labels.len())
            .filter_map(|(index, &timestamp)| {
                self.shifted(index, shift).map(|label| TrainingSample {
                    index,
                    timestamp,
                    label,
                })
            })
            .collect()
    }

    pub fn summary(&self, samples: &[TrainingSample]) -> LabelSummary {
        let mut summary = LabelSummary {
            candles: self.labels.len(),
            samples: samples.len(),
            dropped: self.labels.len().saturating_sub(samples.len()),
            ..LabelSummary::default()
        };
        for label in &self.labels {
            match label {
                Some(Label::ImpulseUp) => summary.impulse_up += 1,
                Some(Label::ImpulseDown) => summary.impulse_down += 1,
                Some(Label::Neutral) => summary.neutral += 1,
                None => summary.unknown += 1,
            }
        }
        summary
    }
}

/// Class counts over the unshifted table plus sample accounting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelSummary {
    pub candles: usize,
    pub impulse_up: usize,
    pub impulse_down: usize,
    pub neutral: usize,
    pub unknown: usize,
    pub samples: usize,
    pub dropped: usize,
}
