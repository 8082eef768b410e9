//! Walk-forward validation: expanding in-sample windows, fixed out-of-sample
//! windows.
//!
//! Each fold backtests its IS range and its OOS range independently; folds
//! run in parallel and are reported in fold order. The degradation ratio
//! (mean OOS Sharpe / mean IS Sharpe) flags overfitting.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use swinglab_core::domain::Candle;

use crate::config::BacktestConfig;
use crate::runner::{run_backtest_from_data, RunError, SignalSpec};

/// Configuration for walk-forward validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalkForwardConfig {
    /// Number of folds (default 5).
    pub n_folds: usize,
    /// Minimum total candles required (default 756, three years of dailies).
    pub min_total_candles: usize,
    /// Minimum in-sample candles for the first fold (default 252).
    pub min_is_candles: usize,
    /// Minimum out-of-sample candles per fold (default 63).
    pub min_oos_candles: usize,
}

impl Default for WalkForwardConfig {
    fn default() -> Self {
        Self {
            n_folds: 5,
            min_total_candles: 756,
            min_is_candles: 252,
            min_oos_candles: 63,
        }
    }
}

/// Candle index ranges of one fold. Ends are exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FoldSpec {
    pub fold_index: usize,
    pub is_start: usize,
    pub is_end: usize,
    pub oos_start: usize,
    pub oos_end: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoldResult {
    pub fold_index: usize,
    pub spec: FoldSpec,
    pub is_sharpe: f64,
    pub oos_sharpe: f64,
    pub is_trades: usize,
    pub oos_trades: usize,
    pub is_return: f64,
    pub oos_return: f64,
}

/// How the degradation ratio was computed, or why it wasn't.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DegradationFlag {
    /// IS Sharpe >= 0.1; plain ratio.
    Normal,
    /// 0 <= IS Sharpe < 0.1; OOS - IS difference instead of a ratio.
    LowIsSharpe,
    /// IS Sharpe negative; no ratio.
    NegativeIsSharpe,
    /// IS Sharpe >= 0.1 but OOS negative; clamped to 0.
    FailedOos,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalkForwardResult {
    pub folds: Vec<FoldResult>,
    pub mean_is_sharpe: f64,
    pub mean_oos_sharpe: f64,
    /// None when the ratio is not meaningful; see `degradation_flag`.
    pub degradation_ratio: Option<f64>,
    pub degradation_flag: DegradationFlag,
}

#[derive(Debug, Error)]
pub enum WalkForwardError {
    #[error("insufficient data: {total_candles} candles < minimum {min_candles}")]
    InsufficientData {
        total_candles: usize,
        min_candles: usize,
    },
    #[error("fold creation failed: cannot fit {n_folds} folds in {total_candles} candles")]
    FoldCreationFailed {
        n_folds: usize,
        total_candles: usize,
    },
    #[error("backtest error on fold {fold}: {source}")]
    BacktestFailed {
        fold: usize,
        #[source]
        source: RunError,
    },
}

/// Expanding-window folds.
///
/// Fold `i` trains on `[0, min_is + i * oos)` and tests on the next `oos`
/// candles, where `oos = (total - min_is) / n_folds`.
pub fn create_folds(
    total_candles: usize,
    config: &WalkForwardConfig,
) -> Result<Vec<FoldSpec>, WalkForwardError> {
    if total_candles < config.min_total_candles {
        return Err(WalkForwardError::InsufficientData {
            total_candles,
            min_candles: config.min_total_candles,
        });
    }
    let n = config.n_folds;
    let fail = WalkForwardError::FoldCreationFailed {
        n_folds: n,
        total_candles,
    };
    if n == 0 || config.min_is_candles == 0 {
        return Err(fail);
    }

    let oos_size = total_candles.saturating_sub(config.min_is_candles) / n;
    if oos_size == 0 || oos_size < config.min_oos_candles {
        return Err(fail);
    }

    let folds: Vec<FoldSpec> = (0..n)
        .map(|i| {
            let is_end = config.min_is_candles + i * oos_size;
            FoldSpec {
                fold_index: i,
                is_start: 0,
                is_end,
                oos_start: is_end,
                oos_end: is_end + oos_size,
            }
        })
        .take_while(|f| f.oos_end <= total_candles)
        .collect();

    if folds.is_empty() {
        return Err(fail);
    }
    Ok(folds)
}

/// Split, backtest every fold, and aggregate.
pub fn run_walk_forward(
    config: &BacktestConfig,
    candles: &[Candle],
    signals: &SignalSpec,
    wf_config: &WalkForwardConfig,
) -> Result<WalkForwardResult, WalkForwardError> {
    let specs = create_folds(candles.len(), wf_config)?;
    tracing::info!(folds = specs.len(), candles = candles.len(), "walk-forward");

    let folds = specs
        .par_iter()
        .map(|spec| run_fold(config, candles, signals, spec))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(aggregate(folds))
}

fn run_fold(
    config: &BacktestConfig,
    candles: &[Candle],
    signals: &SignalSpec,
    spec: &FoldSpec,
) -> Result<FoldResult, WalkForwardError> {
    let failed = |source| WalkForwardError::BacktestFailed {
        fold: spec.fold_index,
        source,
    };
    let is = run_backtest_from_data(config, &candles[spec.is_start..spec.is_end], signals)
        .map_err(failed)?;
    let oos = run_backtest_from_data(config, &candles[spec.oos_start..spec.oos_end], signals)
        .map_err(failed)?;
    tracing::debug!(
        fold = spec.fold_index,
        is_sharpe = is.result.metrics.sharpe,
        oos_sharpe = oos.result.metrics.sharpe,
        "fold done"
    );

    Ok(FoldResult {
        fold_index: spec.fold_index,
        spec: *spec,
        is_sharpe: is.result.metrics.sharpe,
        oos_sharpe: oos.result.metrics.sharpe,
        is_trades: is.result.metrics.trade_count,
        oos_trades: oos.result.metrics.trade_count,
        is_return: is.result.metrics.total_return,
        oos_return: oos.result.metrics.total_return,
    })
}

fn aggregate(folds: Vec<FoldResult>) -> WalkForwardResult {
    let n = folds.len().max(1) as f64;
    let mean_is_sharpe = folds.iter().map(|f| f.is_sharpe).sum::<f64>() / n;
    let mean_oos_sharpe = folds.iter().map(|f| f.oos_sharpe).sum::<f64>() / n;
    let (degradation_ratio, degradation_flag) =
        compute_degradation_ratio(mean_is_sharpe, mean_oos_sharpe);

    WalkForwardResult {
        folds,
        mean_is_sharpe,
        mean_oos_sharpe,
        degradation_ratio,
        degradation_flag,
    }
}

/// Degradation of OOS vs IS Sharpe with the low/negative IS edge cases.
pub fn compute_degradation_ratio(
    mean_is_sharpe: f64,
    mean_oos_sharpe: f64,
) -> (Option<f64>, DegradationFlag) {
    if mean_is_sharpe < 0.0 {
        (None, DegradationFlag::NegativeIsSharpe)
    } else if mean_is_sharpe < 0.1 {
        (
            Some(mean_oos_sharpe - mean_is_sharpe),
            DegradationFlag::LowIsSharpe,
        )
    } else if mean_oos_sharpe < 0.0 {
        (Some(0.0), DegradationFlag::FailedOos)
    } else {
        (
            Some(mean_oos_sharpe / mean_is_sharpe),
            DegradationFlag::Normal,
        )
    }
}
