//! Offline swing labeling: pivots → segments → per-candle labels → training samples.
//!
//! Everything here reads a complete series and is therefore non-causal. The
//! labeler only accepts a [`CompleteSeries`] and shares no interface with the
//! simulation engine's [`crate::signals::SignalSource`].

mod labeler;
mod segments;
mod table;

pub use labeler::{CompleteSeries, LabelSet, OfflineLabeler, SegmentLabeler};
pub use segments::segments_from_pivots;
pub use table::{Label, LabelSummary, LabelTable, TrainingSample};
