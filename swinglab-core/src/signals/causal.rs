use chrono::NaiveDateTime;

use crate::domain::Candle;

/// Read-only prefix `candles[..=t]` of the series being simulated.
///
/// Only the engine can build one.
#[derive(Debug, Clone, Copy)]
pub struct CausalView<'a> {
    prefix: &'a [Candle],
}

impl<'a> CausalView<'a> {
    /// View of `candles[..=index]`. Caller guarantees `index < candles.len()`.
    pub(crate) fn new(candles: &'a [Candle], index: usize) -> Self {
        Self {
            prefix: &candles[..=index],
        }
    }

    /// Position of the current candle within the simulated slice.
    pub fn index(&self) -> usize {
        self.prefix.len() - 1
    }

    pub fn current(&self) -> &'a Candle {
        &self.prefix[self.prefix.len() - 1]
    }

    pub fn timestamp(&self) -> NaiveDateTime {
        self.current().timestamp
    }

    /// All candles up to and including the current one.
    pub fn history(&self) -> &'a [Candle] {
        self.prefix
    }

    /// Candle `lag` steps before the current one.
    pub fn lookback(&self, lag: usize) -> Option<&'a Candle> {
        self.index()
            .checked_sub(lag)
            .map(|i| &self.prefix[i])
    }

    pub fn len(&self) -> usize {
        self.prefix.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prefix.is_empty()
    }
}
