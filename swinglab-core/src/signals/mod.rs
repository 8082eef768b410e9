//! Signal interface consumed by the simulation engine.
//!
//! A signal source only ever sees a [`CausalView`]: the candle prefix up to
//! and including the current candle. Views are constructed by the engine, so
//! a source has no way to reach candles past `t`. Sources must be
//! deterministic for the same candle sequence.

mod causal;
mod precomputed;
mod roc_momentum;

pub use causal::CausalView;
pub use precomputed::PrecomputedSignals;
pub use roc_momentum::RocMomentum;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::PositionSide;
use crate::error::SignalError;

/// Predicted direction for the next move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SignalDirection {
    Up,
    Down,
    None,
}

impl SignalDirection {
    /// Position side this direction would open, if any.
    pub fn side(self) -> Option<PositionSide> {
        match self {
            SignalDirection::Up => Some(PositionSide::Long),
            SignalDirection::Down => Some(PositionSide::Short),
            SignalDirection::None => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SignalDirection::Up => "UP",
            SignalDirection::Down => "DOWN",
            SignalDirection::None => "NONE",
        }
    }
}

impl fmt::Display for SignalDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SignalDirection {
    type Err = String;

    /// Accepts `UP`/`DOWN`/`NONE` in any case, and the classifier's numeric
    /// classes `1`/`2`/`0`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "up" | "long" | "1" => Ok(SignalDirection::Up),
            "down" | "short" | "2" => Ok(SignalDirection::Down),
            "none" | "flat" | "0" | "" => Ok(SignalDirection::None),
            other => Err(format!("unknown signal direction '{other}'")),
        }
    }
}

/// One prediction: direction plus confidence in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub direction: SignalDirection,
    pub confidence: f64,
}

impl Signal {
    pub fn new(direction: SignalDirection, confidence: f64) -> Self {
        Self {
            direction,
            confidence,
        }
    }

    pub fn none() -> Self {
        Self::new(SignalDirection::None, 0.0)
    }

    pub fn up(confidence: f64) -> Self {
        Self::new(SignalDirection::Up, confidence)
    }

    pub fn down(confidence: f64) -> Self {
        Self::new(SignalDirection::Down, confidence)
    }

    /// Directional and at least `threshold` confident.
    pub fn is_actionable(&self, threshold: f64) -> bool {
        self.direction != SignalDirection::None && self.confidence >= threshold
    }
}

/// Per-candle predictor queried by the engine.
///
/// `predict` takes `&mut self` so sources may cache incremental state; the
/// engine calls it at most once per candle, in order.
pub trait SignalSource: Send {
    fn name(&self) -> &str;

    fn predict(&mut self, view: CausalView<'_>) -> Result<Signal, SignalError>;
}

impl<S: SignalSource + ?Sized> SignalSource for Box<S> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn predict(&mut self, view: CausalView<'_>) -> Result<Signal, SignalError> {
        (**self).predict(view)
    }
}
