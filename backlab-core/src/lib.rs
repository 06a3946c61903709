//! Backlab Core — the pure backtest simulation engine.
//!
//! This crate contains the heart of the backtester:
//! - Domain types (bars, signals, trades, equity points, open positions)
//! - Tagged-enum configuration with exhaustive dispatch
//! - Cost model (commission, slippage, sell-side stamp duty)
//! - Position sizers behind a trait plus factory
//! - Exit-condition evaluation with fixed priority
//! - Bar-by-bar execution state machine (Flat ⇄ Long)
//! - Performance metrics with explicit infinity sentinels
//! - Explicit plugin registry for interchangeable algorithms
//!
//! Everything here is pure and synchronous: a run is a deterministic
//! function of `(bars, signals, config)`. Data loading, strategy signal
//! generation, parameter sweeps, and export live in `backlab-runner`.

pub mod config;
pub mod costs;
pub mod domain;
pub mod engine;
pub mod exits;
pub mod indicators;
pub mod metrics;
pub mod registry;
pub mod sizing;

pub use config::{BacktestConfig, SizingRule, StopRule, TakeProfitRule};
pub use costs::CostModel;
pub use domain::{Bar, EquityPoint, ExitReason, OpenPosition, Signal, SignalAction, SignalBook,
                 Trade, TradeSide};
pub use engine::{run_backtest, run_backtest_with_gate, BacktestReport, TradeGate};
pub use metrics::Metrics;
pub use registry::{PluginRegistry, RegistryBuilder, RegistryError};
