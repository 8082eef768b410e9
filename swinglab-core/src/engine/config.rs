//! Engine configuration and its validation.

use serde::{Deserialize, Serialize};

use crate::domain::PositionSide;
use crate::error::ConfigError;

/// Which sides the engine may open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TradingMode {
    LongOnly,
    ShortOnly,
    #[default]
    LongShort,
}

impl TradingMode {
    pub fn allows(self, side: PositionSide) -> bool {
        match self {
            TradingMode::LongOnly => side == PositionSide::Long,
            TradingMode::ShortOnly => side == PositionSide::Short,
            TradingMode::LongShort => true,
        }
    }
}

/// Configuration for a single simulation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    pub initial_capital: f64,
    /// Fraction of notional charged on entry and on exit.
    pub commission_rate: f64,
    /// Fraction of current capital committed per entry, entry commission included.
    pub position_fraction: f64,
    pub stop_loss_pct: f64,
    pub take_profit_pct: f64,
    /// Minimum confidence for a signal to open or flip a position.
    pub confidence_threshold: f64,
    pub trading_mode: TradingMode,
    pub allow_same_candle_reentry: bool,
    /// Candles processed before the signal source is first queried.
    pub warmup_candles: usize,
    /// Minimum candles between an exit and the next entry.
    pub cooldown_candles: usize,
    pub periods_per_year: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            initial_capital: 10_000.0,
            commission_rate: 0.001,
            position_fraction: 0.25,
            stop_loss_pct: 0.05,
            take_profit_pct: 0.10,
            confidence_threshold: 0.6,
            trading_mode: TradingMode::LongShort,
            allow_same_candle_reentry: false,
            warmup_candles: 0,
            cooldown_candles: 0,
            periods_per_year: 252.0,
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.initial_capital.is_finite() || self.initial_capital <= 0.0 {
            return Err(ConfigError::NonPositiveCapital(self.initial_capital));
        }
        if !self.commission_rate.is_finite() || !(0.0..1.0).contains(&self.commission_rate) {
            return Err(ConfigError::out_of_range(
                "commission_rate",
                self.commission_rate,
                "[0, 1)",
            ));
        }
        if !self.position_fraction.is_finite() || self.position_fraction <= 0.0 {
            return Err(ConfigError::out_of_range(
                "position_fraction",
                self.position_fraction,
                "> 0",
            ));
        }
        if self.position_fraction > 1.0 {
            tracing::warn!(
                position_fraction = self.position_fraction,
                "position_fraction above 1.0 is leveraged; equity may go negative"
            );
        }
        open_unit("stop_loss_pct", self.stop_loss_pct)?;
        open_unit("take_profit_pct", self.take_profit_pct)?;
        if !self.confidence_threshold.is_finite()
            || !(0.0..=1.0).contains(&self.confidence_threshold)
        {
            return Err(ConfigError::out_of_range(
                "confidence_threshold",
                self.confidence_threshold,
                "[0, 1]",
            ));
        }
        if !self.periods_per_year.is_finite() || self.periods_per_year <= 0.0 {
            return Err(ConfigError::out_of_range(
                "periods_per_year",
                self.periods_per_year,
                "> 0",
            ));
        }
        Ok(())
    }

    /// Candles that must separate an exit from the next entry.
    pub(crate) fn reentry_gap(&self) -> usize {
        let same_candle = if self.allow_same_candle_reentry { 0 } else { 1 };
        self.cooldown_candles.max(same_candle)
    }
}

fn open_unit(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if !value.is_finite() || value <= 0.0 || value >= 1.0 {
        return Err(ConfigError::out_of_range(field, value, "(0, 1)"));
    }
    Ok(())
}
