//! Backlab Runner — orchestration around the pure engine.
//!
//! The engine in `backlab-core` is a deterministic function; everything
//! that touches the outside world lives here:
//! - Deterministic synthetic bar generation (blake3-seeded random walk)
//! - The MA-crossover demo strategy
//! - Serializable run configuration with content-addressed run ids
//! - Rayon-parallel parameter sweeps ranked by Sharpe
//! - JSON and CSV artifact export

pub mod config;
pub mod export;
pub mod strategy;
pub mod sweep;
pub mod synthetic;

pub use config::{ConfigError, RunConfig, RunId};
pub use strategy::{MaCross, MaCrossParams};
pub use sweep::{run_one, run_sweep, ParamGrid, SweepOutcome, SweepResults};

/// Install the global tracing subscriber. Reads `RUST_LOG`, defaulting to
/// `info`. Safe to call more than once; later calls are no-ops.
pub fn init_logging() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
