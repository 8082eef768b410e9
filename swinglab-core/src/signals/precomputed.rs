use chrono::NaiveDateTime;
use std::collections::BTreeMap;

use super::{CausalView, Signal, SignalSource};
use crate::error::SignalError;

/// Classifier predictions computed ahead of time, keyed by candle timestamp.
///
/// Each prediction must have been produced from features available at its
/// own timestamp. A candle without a prediction is a source failure.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PrecomputedSignals {
    signals: BTreeMap<NaiveDateTime, Signal>,
}

impl PrecomputedSignals {
    pub fn new(signals: BTreeMap<NaiveDateTime, Signal>) -> Self {
        Self { signals }
    }

    pub fn len(&self) -> usize {
        self.signals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.signals.is_empty()
    }

    pub fn get(&self, timestamp: &NaiveDateTime) -> Option<&Signal> {
        self.signals.get(timestamp)
    }

    /// Timestamp order.
    pub fn iter(&self) -> impl Iterator<Item = (&NaiveDateTime, &Signal)> {
        self.signals.iter()
    }
}

impl FromIterator<(NaiveDateTime, Signal)> for PrecomputedSignals {
    fn from_iter<I: IntoIterator<Item = (NaiveDateTime, Signal)>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl SignalSource for PrecomputedSignals {
    fn name(&self) -> &str {
        "precomputed"
    }

    fn predict(&mut self, view: CausalView<'_>) -> Result<Signal, SignalError> {
        let timestamp = view.timestamp();
        self.signals
            .get(&timestamp)
            .copied()
            .ok_or(SignalError::Missing { timestamp })
    }
}
