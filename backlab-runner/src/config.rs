//! Serializable run configuration.
//!
//! Captures everything needed to reproduce a run: symbol, date range,
//! strategy parameters, and the engine config. `run_id()` is a blake3 hash
//! of the canonical JSON form, so identical configs share an id and sweep
//! results can be deduplicated or cached by content.

use std::path::Path;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::strategy::MaCrossParams;
use backlab_core::BacktestConfig;

/// Unique identifier for a run (content-addressable hash).
pub type RunId = String;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {source}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },

    #[error("invalid date range: start {start} is after end {end}")]
    InvalidDateRange { start: NaiveDate, end: NaiveDate },

    #[error("invalid ma_cross periods: fast {fast} must be below slow {slow}")]
    InvalidPeriods { fast: usize, slow: usize },
}

/// Full configuration for a single backtest run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    /// Symbol the synthetic data generator is seeded with.
    pub symbol: String,

    /// First bar date (inclusive).
    pub start_date: NaiveDate,

    /// Last bar date (inclusive).
    pub end_date: NaiveDate,

    /// Strategy parameters.
    #[serde(default)]
    pub strategy: MaCrossParams,

    /// Engine configuration (capital, costs, exits, sizing).
    #[serde(default)]
    pub engine: BacktestConfig,
}

impl RunConfig {
    /// Deterministic content hash of this configuration.
    pub fn run_id(&self) -> RunId {
        let json = serde_json::to_string(self).expect("RunConfig serialization failed");
        blake3::hash(json.as_bytes()).to_hex().to_string()
    }

    /// Load and validate a config from a TOML file.
    pub fn from_toml_path(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let config: RunConfig = toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.start_date > self.end_date {
            return Err(ConfigError::InvalidDateRange {
                start: self.start_date,
                end: self.end_date,
            });
        }
        if self.strategy.fast_period >= self.strategy.slow_period {
            return Err(ConfigError::InvalidPeriods {
                fast: self.strategy.fast_period,
                slow: self.strategy.slow_period,
            });
        }
        Ok(())
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            symbol: "SYNTH".to_string(),
            start_date: NaiveDate::from_ymd_opt(2020, 1, 2).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2023, 12, 29).unwrap(),
            strategy: MaCrossParams::default(),
            engine: BacktestConfig::default(),
        }
    }
}
