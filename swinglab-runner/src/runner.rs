//! Single-run orchestration: config + candles + signal source → outcome.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use swinglab_core::domain::Candle;
use swinglab_core::engine::{run_backtest, RunResult};
use swinglab_core::labeling::{CompleteSeries, LabelSet, OfflineLabeler};
use swinglab_core::signals::{PrecomputedSignals, RocMomentum, SignalSource};
use swinglab_core::{DataIntegrityError, EngineError};

use crate::config::{BacktestConfig, ConfigError};
use crate::data_loader::LoadError;
use crate::fingerprint::RunFingerprint;

/// Current artifact schema version.
pub const SCHEMA_VERSION: u32 = 1;

/// Errors from a single run.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("load error: {0}")]
    Load(#[from] LoadError),
    #[error("data integrity error: {0}")]
    Data(#[from] DataIntegrityError),
    #[error("engine error: {0}")]
    Engine(#[from] EngineError),
    #[error("failed to serialize config for fingerprinting: {0}")]
    Fingerprint(#[from] serde_json::Error),
}

impl From<swinglab_core::ConfigError> for RunError {
    fn from(err: swinglab_core::ConfigError) -> Self {
        RunError::Config(err.into())
    }
}

/// Where a run's signals come from.
///
/// Every run builds a fresh source, so independent runs never share state.
#[derive(Debug, Clone, PartialEq)]
pub enum SignalSpec {
    Precomputed(PrecomputedSignals),
    RocMomentum { period: usize, threshold_pct: f64 },
}

impl SignalSpec {
    pub fn build(&self) -> Result<Box<dyn SignalSource>, swinglab_core::ConfigError> {
        Ok(match self {
            SignalSpec::Precomputed(signals) => Box::new(signals.clone()),
            SignalSpec::RocMomentum {
                period,
                threshold_pct,
            } => Box::new(RocMomentum::new(*period, *threshold_pct)?),
        })
    }

    pub fn name(&self) -> &'static str {
        match self {
            SignalSpec::Precomputed(_) => "precomputed",
            SignalSpec::RocMomentum { .. } => "roc_momentum",
        }
    }

    pub(crate) fn hash_into(&self, hasher: &mut blake3::Hasher) {
        hasher.update(self.name().as_bytes());
        match self {
            SignalSpec::Precomputed(signals) => {
                for (ts, signal) in signals.iter() {
                    hasher.update(ts.to_string().as_bytes());
                    hasher.update(signal.direction.as_str().as_bytes());
                    hasher.update(&signal.confidence.to_bits().to_le_bytes());
                }
            }
            SignalSpec::RocMomentum {
                period,
                threshold_pct,
            } => {
                hasher.update(&(*period as u64).to_le_bytes());
                hasher.update(&threshold_pct.to_bits().to_le_bytes());
            }
        }
    }
}

/// Complete result of one backtest, as persisted in `manifest.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestOutcome {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub fingerprint: RunFingerprint,
    pub config: BacktestConfig,
    pub signal_source: String,
    pub candles: usize,
    pub start: Option<NaiveDateTime>,
    pub end: Option<NaiveDateTime>,
    pub result: RunResult,
}

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

/// Run one backtest over pre-loaded candles.
///
/// `candles` may be any sub-slice of a longer series; indices in the result
/// are relative to the slice.
pub fn run_backtest_from_data(
    config: &BacktestConfig,
    candles: &[Candle],
    signals: &SignalSpec,
) -> Result<BacktestOutcome, RunError> {
    config.validate()?;
    let fingerprint = RunFingerprint::compute(config, candles, signals)?;
    let mut source = signals.build()?;

    let span = tracing::info_span!("backtest", run_id = fingerprint.short_id());
    let _guard = span.enter();

    let result = run_backtest(candles, &mut source, &config.engine_config())?;
    tracing::info!(
        trades = result.trades.len(),
        total_return = result.metrics.total_return,
        sharpe = result.metrics.sharpe,
        "backtest finished"
    );

    Ok(BacktestOutcome {
        schema_version: SCHEMA_VERSION,
        fingerprint,
        config: config.clone(),
        signal_source: source.name().to_string(),
        candles: candles.len(),
        start: candles.first().map(|c| c.timestamp),
        end: candles.last().map(|c| c.timestamp),
        result,
    })
}

/// Run the offline labeler over a complete series.
pub fn run_labeling(config: &BacktestConfig, candles: &[Candle]) -> Result<LabelSet, RunError> {
    config.validate()?;
    let labeler = config.labeler()?;
    let series = CompleteSeries::new(candles)?;
    Ok(labeler.label(&series)?)
}
