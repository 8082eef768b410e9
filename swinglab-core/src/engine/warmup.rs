/// Counts processed candles until the signal source may be queried.
#[derive(Debug, Clone)]
pub struct WarmupState {
    warmup_candles: usize,
    candles_processed: usize,
}

impl WarmupState {
    pub fn new(warmup_candles: usize) -> Self {
        Self {
            warmup_candles,
            candles_processed: 0,
        }
    }

    pub fn process_candle(&mut self) {
        self.candles_processed += 1;
    }

    pub fn is_warm(&self) -> bool {
        self.candles_processed >= self.warmup_candles
    }

    pub fn candles_until_warm(&self) -> usize {
        self.warmup_candles.saturating_sub(self.candles_processed)
    }
}
