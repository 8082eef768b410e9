//! Error taxonomy shared by the labeler and the simulation engine.
//!
//! - `ConfigError`: invalid parameters, surfaced before any run starts.
//! - `DataIntegrityError`: malformed candles; aborts the run in progress.
//! - `SignalError`: the signal source failed or returned garbage; fatal to the run.
//!
//! Insufficient data is deliberately *not* an error: a series too short to
//! confirm a pivot yields an empty label table, and an empty candle slice
//! yields an empty `RunResult`.

use chrono::NaiveDateTime;
use thiserror::Error;

/// Invalid configuration value. Fatal before any run starts.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("deviation threshold must be in (0, 1), got {0}")]
    InvalidThreshold(f64),

    #[error("initial capital must be positive and finite, got {0}")]
    NonPositiveCapital(f64),

    #[error("{field} = {value} is out of range (expected {expected})")]
    OutOfRange {
        field: &'static str,
        value: f64,
        expected: &'static str,
    },
}

impl ConfigError {
    pub(crate) fn out_of_range(field: &'static str, value: f64, expected: &'static str) -> Self {
        Self::OutOfRange {
            field,
            value,
            expected,
        }
    }
}

/// Malformed input data. Never skipped silently: skipping would shift every
/// later index and break causal alignment with the signal stream.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DataIntegrityError {
    #[error("candle {index}: {field} is not finite ({value})")]
    NonFinitePrice {
        index: usize,
        field: &'static str,
        value: f64,
    },

    #[error("candle {index}: {field} must be positive, got {value}")]
    NonPositivePrice {
        index: usize,
        field: &'static str,
        value: f64,
    },

    #[error("candle {index}: inconsistent OHLC (open={open}, high={high}, low={low}, close={close})")]
    InconsistentRange {
        index: usize,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
    },

    #[error("candle {index}: volume must be finite and non-negative, got {value}")]
    InvalidVolume { index: usize, value: f64 },

    #[error("candle {index}: timestamp {current} does not follow {previous}")]
    NonIncreasingTimestamp {
        index: usize,
        previous: NaiveDateTime,
        current: NaiveDateTime,
    },

    #[error("price {index} is not a usable price ({value})")]
    InvalidPrice { index: usize, value: f64 },
}

/// Failure reported by, or detected in the output of, a signal source.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SignalError {
    #[error("signal source failed at candle {index}: {reason}")]
    SourceFailed { index: usize, reason: String },

    #[error("signal confidence {confidence} at candle {index} is outside [0, 1]")]
    ConfidenceOutOfRange { index: usize, confidence: f64 },

    #[error("no signal available for {timestamp}")]
    Missing { timestamp: NaiveDateTime },
}

/// Any error that aborts a simulation run. No partial `RunResult` is returned.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("data integrity error: {0}")]
    DataIntegrity(#[from] DataIntegrityError),

    #[error("signal error: {0}")]
    Signal(#[from] SignalError),
}
