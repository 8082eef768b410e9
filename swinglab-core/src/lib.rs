//! SwingLab Core: swing labeling and causal simulation.
//!
//! This crate contains:
//! - Domain types (candles, pivots, segments, positions, trades, equity samples)
//! - ZigZag pivot detection and offline segment labeling
//! - The signal-source interface and built-in sources
//! - The candle-by-candle simulation engine with its position state machine
//! - Performance metrics
//!
//! No I/O happens here; loading, configuration files and artifacts live in
//! `swinglab-runner`.

pub mod domain;
pub mod engine;
pub mod error;
pub mod labeling;
pub mod metrics;
pub mod signals;
pub mod zigzag;

pub use error::{ConfigError, DataIntegrityError, EngineError, SignalError};

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: result and config types can cross threads for
    /// parallel folds and sweeps.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        // Domain types
        require_send::<domain::Candle>();
        require_sync::<domain::Candle>();
        require_send::<domain::PivotPoint>();
        require_sync::<domain::PivotPoint>();
        require_send::<domain::WaveSegment>();
        require_sync::<domain::WaveSegment>();
        require_send::<domain::Position>();
        require_sync::<domain::Position>();
        require_send::<domain::Trade>();
        require_sync::<domain::Trade>();

        // Labeling
        require_send::<zigzag::ZigZag>();
        require_sync::<zigzag::ZigZag>();
        require_send::<labeling::SegmentLabeler>();
        require_sync::<labeling::SegmentLabeler>();
        require_send::<labeling::LabelSet>();
        require_sync::<labeling::LabelSet>();

        // Signals
        require_send::<signals::PrecomputedSignals>();
        require_sync::<signals::PrecomputedSignals>();
        require_send::<signals::RocMomentum>();
        require_sync::<signals::RocMomentum>();

        // Engine
        require_send::<engine::EngineConfig>();
        require_sync::<engine::EngineConfig>();
        require_send::<engine::RunResult>();
        require_sync::<engine::RunResult>();
        require_send::<metrics::Metrics>();
        require_sync::<metrics::Metrics>();

        // Errors
        require_send::<EngineError>();
        require_sync::<EngineError>();
    }

    /// The offline labeler and the engine's signal source are separate
    /// interfaces: one takes a complete series, the other a causal prefix.
    #[test]
    fn labeler_and_signal_source_take_different_inputs() {
        fn _labeler(
            l: &dyn labeling::OfflineLabeler,
            s: &labeling::CompleteSeries<'_>,
        ) -> Result<labeling::LabelSet, DataIntegrityError> {
            l.label(s)
        }
        fn _source(
            s: &mut dyn signals::SignalSource,
            v: signals::CausalView<'_>,
        ) -> Result<signals::Signal, SignalError> {
            s.predict(v)
        }
    }
}
