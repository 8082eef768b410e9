//! Grid search over stop-loss, take-profit and confidence threshold.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use swinglab_core::domain::Candle;
use swinglab_core::metrics::Metrics;

use crate::config::{BacktestConfig, ConfigError};
use crate::runner::{run_backtest_from_data, RunError, SignalSpec};

#[derive(Debug, Error)]
pub enum SweepError {
    #[error("parameter grid is empty")]
    EmptyGrid,
    #[error("grid point {index} is invalid: {source}")]
    InvalidPoint {
        index: usize,
        #[source]
        source: ConfigError,
    },
    #[error("grid point {index} failed: {source}")]
    RunFailed {
        index: usize,
        #[source]
        source: RunError,
    },
}

/// Values to try for each swept parameter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParamGrid {
    pub stop_loss_pcts: Vec<f64>,
    pub take_profit_pcts: Vec<f64>,
    pub confidence_thresholds: Vec<f64>,
}

impl ParamGrid {
    pub fn size(&self) -> usize {
        self.stop_loss_pcts.len() * self.take_profit_pcts.len() * self.confidence_thresholds.len()
    }

    /// Cartesian product in grid order: stop loss outermost, confidence
    /// innermost. Every point is validated before any run starts.
    pub fn generate_configs(&self, base: &BacktestConfig) -> Result<Vec<BacktestConfig>, SweepError> {
        if self.size() == 0 {
            return Err(SweepError::EmptyGrid);
        }
        let mut configs = Vec::with_capacity(self.size());
        for &stop_loss in &self.stop_loss_pcts {
            for &take_profit in &self.take_profit_pcts {
                for &confidence in &self.confidence_thresholds {
                    let mut config = base.clone();
                    config.strategy.stop_loss_pct = stop_loss;
                    config.strategy.take_profit_pct = take_profit;
                    config.strategy.confidence_threshold = confidence;
                    config
                        .validate()
                        .map_err(|source| SweepError::InvalidPoint {
                            index: configs.len(),
                            source,
                        })?;
                    configs.push(config);
                }
            }
        }
        Ok(configs)
    }
}

/// One evaluated grid point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepPoint {
    pub index: usize,
    pub stop_loss_pct: f64,
    pub take_profit_pct: f64,
    pub confidence_threshold: f64,
    pub run_id: String,
    pub metrics: Metrics,
}

/// Sweep results, in grid order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepResults {
    pub points: Vec<SweepPoint>,
}

impl SweepResults {
    /// Best Sharpe first; ties keep grid order.
    pub fn sorted_by_sharpe(&self) -> Vec<&SweepPoint> {
        let mut sorted: Vec<&SweepPoint> = self.points.iter().collect();
        sorted.sort_by(|a, b| b.metrics.sharpe.total_cmp(&a.metrics.sharpe));
        sorted
    }

    pub fn best(&self) -> Option<&SweepPoint> {
        self.sorted_by_sharpe().into_iter().next()
    }
}

/// Runs every grid point, optionally in parallel.
pub struct ParamSweep {
    parallel: bool,
}

impl Default for ParamSweep {
    fn default() -> Self {
        Self::new()
    }
}

impl ParamSweep {
    pub fn new() -> Self {
        Self { parallel: true }
    }

    pub fn with_parallelism(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn sweep(
        &self,
        grid: &ParamGrid,
        base: &BacktestConfig,
        candles: &[Candle],
        signals: &SignalSpec,
    ) -> Result<SweepResults, SweepError> {
        let configs = grid.generate_configs(base)?;
        tracing::info!(
            points = configs.len(),
            parallel = self.parallel,
            "parameter sweep"
        );

        let run = |(index, config): (usize, &BacktestConfig)| -> Result<SweepPoint, SweepError> {
            let outcome = run_backtest_from_data(config, candles, signals)
                .map_err(|source| SweepError::RunFailed { index, source })?;
            Ok(SweepPoint {
                index,
                stop_loss_pct: config.strategy.stop_loss_pct,
                take_profit_pct: config.strategy.take_profit_pct,
                confidence_threshold: config.strategy.confidence_threshold,
                run_id: outcome.fingerprint.run_id,
                metrics: outcome.result.metrics,
            })
        };

        let points = if self.parallel {
            configs
                .par_iter()
                .enumerate()
                .map(run)
                .collect::<Result<Vec<_>, _>>()?
        } else {
            configs
                .iter()
                .enumerate()
                .map(run)
                .collect::<Result<Vec<_>, _>>()?
        };

        Ok(SweepResults { points })
    }
}
