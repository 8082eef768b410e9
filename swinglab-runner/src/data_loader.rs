//! CSV loading for candles and precomputed classifier signals.
//!
//! Candle files carry `timestamp,open,high,low,close,volume`; signal files
//! carry `timestamp,direction,confidence`. Timestamps are either dates
//! (`2024-01-02`) or date-times (`2024-01-02 09:30:00`, `T` also accepted).

use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use chrono::{NaiveDate, NaiveDateTime};
use serde::Deserialize;
use thiserror::Error;

use swinglab_core::domain::{validate_series, Candle};
use swinglab_core::signals::{PrecomputedSignals, Signal, SignalDirection};
use swinglab_core::DataIntegrityError;

/// Errors from the data loading layer.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to open {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("row {row}: unrecognized timestamp '{value}'")]
    Timestamp { row: usize, value: String },

    #[error("row {row}: unrecognized direction '{value}'")]
    Direction { row: usize, value: String },

    #[error("row {row}: duplicate signal timestamp {timestamp}")]
    DuplicateSignal { row: usize, timestamp: NaiveDateTime },

    #[error("data integrity: {0}")]
    Integrity(#[from] DataIntegrityError),
}

#[derive(Debug, Deserialize)]
struct CandleRow {
    timestamp: String,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    #[serde(default)]
    volume: f64,
}

#[derive(Debug, Deserialize)]
struct SignalRow {
    timestamp: String,
    direction: String,
    confidence: f64,
}

/// Parse a date or date-time. Dates map to midnight.
pub fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"] {
        if let Ok(ts) = NaiveDateTime::parse_from_str(value, format) {
            return Some(ts);
        }
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

fn open(path: &Path) -> Result<File, LoadError> {
    File::open(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn reader<R: Read>(input: R) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(input)
}

/// Load and validate a candle CSV file.
pub fn load_candles(path: &Path) -> Result<Vec<Candle>, LoadError> {
    let candles = read_candles(open(path)?)?;
    tracing::info!(path = %path.display(), candles = candles.len(), "loaded candles");
    Ok(candles)
}

/// Read candles from any CSV source. The series is validated before return.
pub fn read_candles<R: Read>(input: R) -> Result<Vec<Candle>, LoadError> {
    let mut candles = Vec::new();
    for (i, row) in reader(input).deserialize::<CandleRow>().enumerate() {
        let row = row?;
        let timestamp = parse_timestamp(&row.timestamp).ok_or_else(|| LoadError::Timestamp {
            row: i + 1,
            value: row.timestamp.clone(),
        })?;
        candles.push(Candle {
            timestamp,
            open: row.open,
            high: row.high,
            low: row.low,
            close: row.close,
            volume: row.volume,
        });
    }
    validate_series(&candles)?;
    Ok(candles)
}

/// Load a precomputed signal CSV file.
pub fn load_signals(path: &Path) -> Result<PrecomputedSignals, LoadError> {
    let signals = read_signals(open(path)?)?;
    tracing::info!(path = %path.display(), signals = signals.len(), "loaded signals");
    Ok(signals)
}

/// Read signals from any CSV source. Duplicate timestamps are rejected.
///
/// Confidence is not range-checked here; the engine rejects an
/// out-of-range confidence when the candle is actually queried.
pub fn read_signals<R: Read>(input: R) -> Result<PrecomputedSignals, LoadError> {
    let mut signals = BTreeMap::new();
    for (i, row) in reader(input).deserialize::<SignalRow>().enumerate() {
        let row = row?;
        let timestamp = parse_timestamp(&row.timestamp).ok_or_else(|| LoadError::Timestamp {
            row: i + 1,
            value: row.timestamp.clone(),
        })?;
        let direction: SignalDirection =
            row.direction.parse().map_err(|_| LoadError::Direction {
                row: i + 1,
                value: row.direction.clone(),
            })?;
        let signal = Signal::new(direction, row.confidence);
        if signals.insert(timestamp, signal).is_some() {
            return Err(LoadError::DuplicateSignal { row: i + 1, timestamp });
        }
    }
    Ok(PrecomputedSignals::new(signals))
}
