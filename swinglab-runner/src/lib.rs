//! SwingLab Runner: configuration, data loading and run orchestration.
//!
//! This crate builds on `swinglab-core` to provide:
//! - TOML configuration with strict key checking
//! - CSV candle and precomputed-signal loading
//! - Content-addressed run fingerprints
//! - Single backtests, offline labeling, walk-forward validation and
//!   parameter sweeps
//! - Artifact export (CSV tables and JSON manifests)

pub mod config;
pub mod data_loader;
pub mod export;
pub mod fingerprint;
pub mod runner;
pub mod sweep;
pub mod walk_forward;

pub use config::{BacktestConfig, ConfigError};
pub use data_loader::{load_candles, load_signals, LoadError};
pub use fingerprint::RunFingerprint;
pub use runner::{
    run_backtest_from_data, run_labeling, BacktestOutcome, RunError, SignalSpec, SCHEMA_VERSION,
};
pub use sweep::{ParamGrid, ParamSweep, SweepError, SweepPoint, SweepResults};
pub use walk_forward::{
    run_walk_forward, DegradationFlag, WalkForwardConfig, WalkForwardError, WalkForwardResult,
};
