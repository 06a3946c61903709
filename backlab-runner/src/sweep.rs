//! Parameter sweep over strategy and stop-loss grids.
//!
//! Each candidate config is an independent, pure engine run, so the sweep
//! is embarrassingly parallel: one rayon task per config, no shared state.
//! Outcomes are keyed by content-addressed run id and ranked by Sharpe.

use std::collections::HashMap;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::{ConfigError, RunConfig, RunId};
use crate::strategy::{MaCross, MaCrossParams};
use crate::synthetic::generate_bars;
use backlab_core::registry::StrategyPlugin;
use backlab_core::{run_backtest, Metrics, StopRule};

/// Parameter grid: MA periods crossed with stop-loss percents.
/// `None` in `stop_pcts` means "no stop" is one of the candidates.
#[derive(Debug, Clone)]
pub struct ParamGrid {
    pub fast_periods: Vec<usize>,
    pub slow_periods: Vec<usize>,
    pub stop_pcts: Vec<Option<f64>>,
}

impl ParamGrid {
    /// A small default grid: fast 5/10/20, slow 30/60/120, stop off/5%/8%.
    pub fn ma_cross_default() -> Self {
        Self {
            fast_periods: vec![5, 10, 20],
            slow_periods: vec![30, 60, 120],
            stop_pcts: vec![None, Some(0.05), Some(0.08)],
        }
    }

    /// Upper bound on the number of configurations (before the
    /// fast-below-slow filter).
    pub fn size(&self) -> usize {
        self.fast_periods.len() * self.slow_periods.len() * self.stop_pcts.len()
    }

    /// All valid configurations, derived from `base`.
    pub fn generate_configs(&self, base: &RunConfig) -> Vec<RunConfig> {
        let mut configs = Vec::new();
        for &fast in &self.fast_periods {
            for &slow in &self.slow_periods {
                if fast >= slow {
                    continue;
                }
                for &stop in &self.stop_pcts {
                    let mut config = base.clone();
                    config.strategy = MaCrossParams {
                        fast_period: fast,
                        slow_period: slow,
                    };
                    config.engine.stop_loss = stop.map(|pct| StopRule::Percent { pct });
                    configs.push(config);
                }
            }
        }
        configs
    }
}

/// One finished sweep candidate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepOutcome {
    pub run_id: RunId,
    pub config: RunConfig,
    pub metrics: Metrics,
    pub final_equity: f64,
}

/// Run one candidate end to end: synthetic bars, signals, engine.
pub fn run_one(config: &RunConfig) -> SweepOutcome {
    let bars = generate_bars(&config.symbol, config.start_date, config.end_date);
    let signals = MaCross::new(config.strategy).generate_signals(&bars);
    let report = run_backtest(&bars, &signals, &config.engine);

    let run_id = config.run_id();
    debug!(
        %run_id,
        trades = report.trades.len(),
        sharpe = report.metrics.sharpe_ratio,
        "sweep candidate finished"
    );

    SweepOutcome {
        run_id,
        config: config.clone(),
        metrics: report.metrics,
        final_equity: report.final_equity,
    }
}

/// Execute the full grid in parallel and collect ranked outcomes.
pub fn run_sweep(grid: &ParamGrid, base: &RunConfig) -> Result<SweepResults, ConfigError> {
    if base.start_date > base.end_date {
        return Err(ConfigError::InvalidDateRange {
            start: base.start_date,
            end: base.end_date,
        });
    }

    let configs = grid.generate_configs(base);
    info!(
        candidates = configs.len(),
        symbol = %base.symbol,
        "starting parameter sweep"
    );

    let outcomes: Vec<SweepOutcome> = configs.par_iter().map(run_one).collect();

    info!(finished = outcomes.len(), "parameter sweep complete");
    Ok(SweepResults::new(outcomes))
}

/// Sweep results with by-id lookup and Sharpe ranking.
#[derive(Debug)]
pub struct SweepResults {
    outcomes: Vec<SweepOutcome>,
    index_by_run_id: HashMap<RunId, usize>,
}

impl SweepResults {
    fn new(outcomes: Vec<SweepOutcome>) -> Self {
        let index_by_run_id = outcomes
            .iter()
            .enumerate()
            .map(|(i, o)| (o.run_id.clone(), i))
            .collect();
        Self {
            outcomes,
            index_by_run_id,
        }
    }

    pub fn all(&self) -> &[SweepOutcome] {
        &self.outcomes
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn get(&self, run_id: &str) -> Option<&SweepOutcome> {
        self.index_by_run_id
            .get(run_id)
            .map(|&i| &self.outcomes[i])
    }

    /// Outcomes sorted by Sharpe, best first. Infinite and NaN-free by
    /// construction (the metrics layer never emits NaN).
    pub fn ranked_by_sharpe(&self) -> Vec<&SweepOutcome> {
        let mut ranked: Vec<&SweepOutcome> = self.outcomes.iter().collect();
        ranked.sort_by(|a, b| {
            b.metrics
                .sharpe_ratio
                .partial_cmp(&a.metrics.sharpe_ratio)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        ranked
    }

    pub fn best(&self) -> Option<&SweepOutcome> {
        self.ranked_by_sharpe().into_iter().next()
    }
}
