//! TOML backtest configuration.
//!
//! Every section rejects unknown keys, so a typo fails at load time instead
//! of silently falling back to a default.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use swinglab_core::engine::{EngineConfig, TradingMode};
use swinglab_core::labeling::SegmentLabeler;
use swinglab_core::zigzag::PriceSource;

/// Errors from loading or validating a configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid parameter: {0}")]
    Invalid(#[from] swinglab_core::ConfigError),
}

/// Complete configuration for labeling and backtesting one series.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BacktestConfig {
    pub labeling: LabelingSection,
    pub strategy: StrategySection,
    pub account: AccountSection,
    pub metrics: MetricsSection,
}

/// `[labeling]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LabelingSection {
    pub deviation_threshold: f64,
    pub label_shift: i64,
    pub price_source: PriceSource,
    pub neutral_band: Option<f64>,
}

impl Default for LabelingSection {
    fn default() -> Self {
        Self {
            deviation_threshold: 0.03,
            label_shift: 5,
            price_source: PriceSource::Close,
            neutral_band: None,
        }
    }
}

/// `[strategy]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StrategySection {
    pub stop_loss_pct: f64,
    pub take_profit_pct: f64,
    pub confidence_threshold: f64,
    pub position_fraction: f64,
    pub trading_mode: TradingMode,
    pub allow_same_candle_reentry: bool,
    pub warmup_candles: usize,
    pub cooldown_candles: usize,
}

impl Default for StrategySection {
    fn default() -> Self {
        let engine = EngineConfig::default();
        Self {
            stop_loss_pct: engine.stop_loss_pct,
            take_profit_pct: engine.take_profit_pct,
            confidence_threshold: engine.confidence_threshold,
            position_fraction: engine.position_fraction,
            trading_mode: engine.trading_mode,
            allow_same_candle_reentry: engine.allow_same_candle_reentry,
            warmup_candles: engine.warmup_candles,
            cooldown_candles: engine.cooldown_candles,
        }
    }
}

/// `[account]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AccountSection {
    pub initial_capital: f64,
    pub commission_rate: f64,
}

impl Default for AccountSection {
    fn default() -> Self {
        let engine = EngineConfig::default();
        Self {
            initial_capital: engine.initial_capital,
            commission_rate: engine.commission_rate,
        }
    }
}

/// `[metrics]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MetricsSection {
    pub periods_per_year: f64,
}

impl Default for MetricsSection {
    fn default() -> Self {
        Self {
            periods_per_year: EngineConfig::default().periods_per_year,
        }
    }
}

impl BacktestConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml(&text)?;
        tracing::debug!(path = %path.display(), "loaded config");
        Ok(config)
    }

    /// Check every section. Called once, before any run.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.labeler()?;
        self.engine_config().validate()?;
        Ok(())
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            initial_capital: self.account.initial_capital,
            commission_rate: self.account.commission_rate,
            position_fraction: self.strategy.position_fraction,
            stop_loss_pct: self.strategy.stop_loss_pct,
            take_profit_pct: self.strategy.take_profit_pct,
            confidence_threshold: self.strategy.confidence_threshold,
            trading_mode: self.strategy.trading_mode,
            allow_same_candle_reentry: self.strategy.allow_same_candle_reentry,
            warmup_candles: self.strategy.warmup_candles,
            cooldown_candles: self.strategy.cooldown_candles,
            periods_per_year: self.metrics.periods_per_year,
        }
    }

    pub fn labeler(&self) -> Result<SegmentLabeler, swinglab_core::ConfigError> {
        let labeler = SegmentLabeler::new(
            self.labeling.deviation_threshold,
            self.labeling.label_shift,
        )?
        .with_price_source(self.labeling.price_source);
        match self.labeling.neutral_band {
            Some(band) => labeler.with_neutral_band(band),
            None => Ok(labeler),
        }
    }

    /// Canonical JSON used for fingerprinting.
    pub fn canonical_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
