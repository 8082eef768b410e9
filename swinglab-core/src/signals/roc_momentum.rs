//! ROC momentum source: rate of change over N candles versus a threshold.
//!
//! ROC is a percentage: `(close[t] / close[t - period] - 1) * 100`.
//! Up when `roc > threshold_pct`, Down when `roc < -threshold_pct`.
//! Confidence grows with how far ROC clears the threshold.

use super::{CausalView, Signal, SignalSource};
use crate::error::{ConfigError, SignalError};

/// Causal rate-of-change momentum source. Baseline for comparing classifiers.
#[derive(Debug, Clone)]
pub struct RocMomentum {
    period: usize,
    threshold_pct: f64,
    /// Excess ROC (percentage points) that maps to confidence 1.0.
    full_confidence_pct: f64,
}

impl RocMomentum {
    pub fn new(period: usize, threshold_pct: f64) -> Result<Self, ConfigError> {
        if period == 0 {
            return Err(ConfigError::out_of_range("roc_period", 0.0, ">= 1"));
        }
        if !threshold_pct.is_finite() || threshold_pct < 0.0 {
            return Err(ConfigError::out_of_range(
                "roc_threshold_pct",
                threshold_pct,
                ">= 0",
            ));
        }
        Ok(Self {
            period,
            threshold_pct,
            full_confidence_pct: 10.0,
        })
    }

    pub fn with_full_confidence_at(mut self, excess_pct: f64) -> Result<Self, ConfigError> {
        if !excess_pct.is_finite() || excess_pct <= 0.0 {
            return Err(ConfigError::out_of_range(
                "roc_full_confidence_pct",
                excess_pct,
                "> 0",
            ));
        }
        self.full_confidence_pct = excess_pct;
        Ok(self)
    }
}

impl SignalSource for RocMomentum {
    fn name(&self) -> &str {
        "roc_momentum"
    }

    fn predict(&mut self, view: CausalView<'_>) -> Result<Signal, SignalError> {
        let Some(base) = view.lookback(self.period) else {
            return Ok(Signal::none());
        };
        let roc = (view.current().close / base.close - 1.0) * 100.0;
        if !roc.is_finite() {
            return Err(SignalError::SourceFailed {
                index: view.index(),
                reason: format!("non-finite rate of change ({roc})"),
            });
        }

        let excess = roc.abs() - self.threshold_pct;
        let confidence = (excess / self.full_confidence_pct).clamp(0.01, 1.0);

        let signal = if roc > self.threshold_pct {
            Signal::up(confidence)
        } else if roc < -self.threshold_pct {
            Signal::down(confidence)
        } else {
            Signal::none()
        };
        Ok(signal)
    }
}
