//! Content-addressed run identity.
//!
//! A run is identified by BLAKE3 over the canonical config JSON, the candle
//! bytes and the signal bytes. The same inputs always give the same
//! `run_id`, so artifact directories are stable across reruns.

use blake3::Hasher;
use serde::{Deserialize, Serialize};

use swinglab_core::domain::Candle;

use crate::config::BacktestConfig;
use crate::runner::SignalSpec;

/// Hex digests identifying one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunFingerprint {
    pub run_id: String,
    pub config_hash: String,
    pub dataset_hash: String,
    pub signals_hash: String,
}

impl RunFingerprint {
    pub fn compute(
        config: &BacktestConfig,
        candles: &[Candle],
        signals: &SignalSpec,
    ) -> Result<Self, serde_json::Error> {
        let config_hash = blake3::hash(config.canonical_json()?.as_bytes());
        let dataset_hash = dataset_hash(candles);

        let mut hasher = Hasher::new();
        signals.hash_into(&mut hasher);
        let signals_hash = hasher.finalize();

        let mut hasher = Hasher::new();
        hasher.update(config_hash.as_bytes());
        hasher.update(dataset_hash.as_bytes());
        hasher.update(signals_hash.as_bytes());
        let run_id = hasher.finalize();

        Ok(Self {
            run_id: run_id.to_hex().to_string(),
            config_hash: config_hash.to_hex().to_string(),
            dataset_hash: dataset_hash.to_hex().to_string(),
            signals_hash: signals_hash.to_hex().to_string(),
        })
    }

    /// First 16 hex characters, for log spans.
    pub fn short_id(&self) -> &str {
        &self.run_id[..16.min(self.run_id.len())]
    }
}

/// Identity of a labeling pass: config plus candles, no signals.
pub fn label_run_id(config: &BacktestConfig, candles: &[Candle]) -> Result<String, serde_json::Error> {
    let mut hasher = Hasher::new();
    hasher.update(b"labels");
    hasher.update(blake3::hash(config.canonical_json()?.as_bytes()).as_bytes());
    hasher.update(dataset_hash(candles).as_bytes());
    Ok(hasher.finalize().to_hex().to_string())
}

/// BLAKE3 over every candle's timestamp and OHLCV bits.
pub fn dataset_hash(candles: &[Candle]) -> blake3::Hash {
    let mut hasher = Hasher::new();
    for c in candles {
        let ts = c.timestamp.and_utc();
        hasher.update(&ts.timestamp().to_le_bytes());
        hasher.update(&ts.timestamp_subsec_nanos().to_le_bytes());
        for value in [c.open, c.high, c.low, c.close, c.volume] {
            hasher.update(&value.to_bits().to_le_bytes());
        }
    }
    hasher.finalize()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};

    fn candles(n: usize) -> Vec<Candle> {
        let base = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        (0..n)
            .map(|i| Candle {
                timestamp: base + Duration::days(i as i64),
                open: 100.0,
                high: 101.0,
                low: 99.0,
                close: 100.0 + i as f64 * 0.1,
                volume: 10.0,
            })
            .collect()
    }

    fn roc() -> SignalSpec {
        SignalSpec::RocMomentum {
            period: 5,
            threshold_pct: 1.0,
        }
    }

    #[test]
    fn run_id_is_deterministic() {
        let config = BacktestConfig::default();
        let a = RunFingerprint::compute(&config, &candles(20), &roc()).unwrap();
        let b = RunFingerprint::compute(&config, &candles(20), &roc()).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.run_id.len(), 64);
        assert_eq!(a.short_id().len(), 16);
    }

    #[test]
    fn run_id_changes_with_any_input() {
        let config = BacktestConfig::default();
        let base = RunFingerprint::compute(&config, &candles(20), &roc()).unwrap();

        let mut changed = config.clone();
        changed.strategy.stop_loss_pct = 0.04;
        let by_config = RunFingerprint::compute(&changed, &candles(20), &roc()).unwrap();
        assert_ne!(base.run_id, by_config.run_id);
        assert_eq!(base.dataset_hash, by_config.dataset_hash);

        let by_data = RunFingerprint::compute(&config, &candles(21), &roc()).unwrap();
        assert_ne!(base.run_id, by_data.run_id);

        let other_signal = SignalSpec::RocMomentum {
            period: 6,
            threshold_pct: 1.0,
        };
        let by_signal = RunFingerprint::compute(&config, &candles(20), &other_signal).unwrap();
        assert_ne!(base.run_id, by_signal.run_id);
        assert_eq!(base.config_hash, by_signal.config_hash);
    }

    #[test]
    fn label_run_id_depends_on_config_and_candles() {
        let config = BacktestConfig::default();
        let a = label_run_id(&config, &candles(30)).unwrap();
        assert_eq!(a, label_run_id(&config, &candles(30)).unwrap());
        assert_ne!(a, label_run_id(&config, &candles(31)).unwrap());
        let backtest = RunFingerprint::compute(&config, &candles(30), &roc()).unwrap();
        assert_ne!(a, backtest.run_id);
    }
}
