//! Simulation engine: candle-by-candle causal replay.
//!
//! The engine owns the single position slot for the duration of a run and
//! is the only code that builds [`crate::signals::CausalView`]s. Runs share
//! no mutable state, so independent runs can execute in parallel.

pub mod accounting;
pub mod config;
pub mod loop_runner;
pub mod position_machine;
pub mod state;
pub mod warmup;

pub use accounting::Account;
pub use config::{EngineConfig, TradingMode};
pub use loop_runner::run_backtest;
pub use position_machine::{Levels, PositionMachine};
pub use state::{Action, ActionKind, RunCounters, RunResult};
pub use warmup::WarmupState;
