//! Explicit plugin registry for interchangeable algorithms.
//!
//! Four capability traits cover the pluggable seams: indicators, signal
//! strategies, risk (exit) rules, and portfolio sizing. The registry is a
//! plain value built once at startup and passed by reference into whatever
//! needs it. No module-level singleton, no hidden mutable state.
//!
//! Registration is a one-shot build step: `RegistryBuilder` rejects a
//! duplicate id with `RegistryError::DuplicateId`, and the finished
//! `PluginRegistry` is immutable keyed-map lookup from then on.

use std::collections::BTreeMap;

use thiserror::Error;

use crate::domain::{Bar, OpenPosition, Signal};
use crate::exits::ExitTrigger;
use crate::sizing::SizingContext;

/// Computes a derived series over the bars, aligned index-for-index
/// (warm-up prefix as NaN).
pub trait IndicatorPlugin: Send + Sync {
    fn id(&self) -> &str;
    fn compute(&self, bars: &[Bar]) -> Vec<f64>;
}

/// Turns a bar series into a signal series. Non-actionable bars are `Hold`;
/// the engine ignores those, so emitting one per bar is fine.
pub trait StrategyPlugin: Send + Sync {
    fn id(&self) -> &str;
    fn generate_signals(&self, bars: &[Bar]) -> Vec<Signal>;
}

/// A risk rule consulted while a position is open; returning a trigger
/// closes the position at that bar.
pub trait RiskPlugin: Send + Sync {
    fn id(&self) -> &str;
    fn check(&self, position: &OpenPosition, bars: &[Bar], index: usize) -> Option<ExitTrigger>;
}

/// Decides how many shares an entry takes. Same contract as the built-in
/// sizers, but id-addressable.
pub trait PortfolioPlugin: Send + Sync {
    fn id(&self) -> &str;
    fn size(&self, ctx: &SizingContext) -> f64;
}

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("duplicate {kind} plugin id `{id}`")]
    DuplicateId { kind: &'static str, id: String },
}

/// One-shot builder. Each `with_*` call either adds the plugin or fails the
/// whole build on an id collision.
#[derive(Default)]
pub struct RegistryBuilder {
    indicators: BTreeMap<String, Box<dyn IndicatorPlugin>>,
    strategies: BTreeMap<String, Box<dyn StrategyPlugin>>,
    risk_rules: BTreeMap<String, Box<dyn RiskPlugin>>,
    portfolios: BTreeMap<String, Box<dyn PortfolioPlugin>>,
}

impl std::fmt::Debug for RegistryBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistryBuilder")
            .field("indicators", &self.indicators.keys())
            .field("strategies", &self.strategies.keys())
            .field("risk_rules", &self.risk_rules.keys())
            .field("portfolios", &self.portfolios.keys())
            .finish()
    }
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_indicator(mut self, plugin: Box<dyn IndicatorPlugin>) -> Result<Self, RegistryError> {
        insert(&mut self.indicators, "indicator", plugin.id().to_owned(), plugin)?;
        Ok(self)
    }

    pub fn with_strategy(mut self, plugin: Box<dyn StrategyPlugin>) -> Result<Self, RegistryError> {
        insert(&mut self.strategies, "strategy", plugin.id().to_owned(), plugin)?;
        Ok(self)
    }

    pub fn with_risk_rule(mut self, plugin: Box<dyn RiskPlugin>) -> Result<Self, RegistryError> {
        insert(&mut self.risk_rules, "risk", plugin.id().to_owned(), plugin)?;
        Ok(self)
    }

    pub fn with_portfolio(mut self, plugin: Box<dyn PortfolioPlugin>) -> Result<Self, RegistryError> {
        insert(&mut self.portfolios, "portfolio", plugin.id().to_owned(), plugin)?;
        Ok(self)
    }

    pub fn build(self) -> PluginRegistry {
        PluginRegistry {
            indicators: self.indicators,
            strategies: self.strategies,
            risk_rules: self.risk_rules,
            portfolios: self.portfolios,
        }
    }
}

fn insert<T: ?Sized>(
    map: &mut BTreeMap<String, Box<T>>,
    kind: &'static str,
    id: String,
    plugin: Box<T>,
) -> Result<(), RegistryError> {
    if map.contains_key(&id) {
        return Err(RegistryError::DuplicateId { kind, id });
    }
    map.insert(id, plugin);
    Ok(())
}

/// Immutable plugin lookup by id.
pub struct PluginRegistry {
    indicators: BTreeMap<String, Box<dyn IndicatorPlugin>>,
    strategies: BTreeMap<String, Box<dyn StrategyPlugin>>,
    risk_rules: BTreeMap<String, Box<dyn RiskPlugin>>,
    portfolios: BTreeMap<String, Box<dyn PortfolioPlugin>>,
}

impl PluginRegistry {
    pub fn indicator(&self, id: &str) -> Option<&dyn IndicatorPlugin> {
        self.indicators.get(id).map(|p| p.as_ref())
    }

    pub fn strategy(&self, id: &str) -> Option<&dyn StrategyPlugin> {
        self.strategies.get(id).map(|p| p.as_ref())
    }

    pub fn risk_rule(&self, id: &str) -> Option<&dyn RiskPlugin> {
        self.risk_rules.get(id).map(|p| p.as_ref())
    }

    pub fn portfolio(&self, id: &str) -> Option<&dyn PortfolioPlugin> {
        self.portfolios.get(id).map(|p| p.as_ref())
    }

    pub fn strategy_ids(&self) -> impl Iterator<Item = &str> {
        self.strategies.keys().map(String::as_str)
    }
}
