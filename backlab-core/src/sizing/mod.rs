//! Position sizers — convert available cash plus a fill price into shares.
//!
//! Sizers are portfolio-aware (cash, trade history) but signal-agnostic.
//! Every sizer returns whole shares, never more than the commission-adjusted
//! cash can pay for, and degrades to 0 on non-positive inputs — a "no trade"
//! outcome, not an error.

pub mod atr_risk;
pub mod fixed_fraction;
pub mod full;
pub mod kelly;

pub use atr_risk::AtrRiskSizer;
pub use fixed_fraction::FixedFractionSizer;
pub use full::FullSizer;
pub use kelly::KellySizer;

use crate::config::SizingRule;
use crate::domain::{Bar, Trade};

/// Everything a sizer may consult when sizing an entry.
///
/// `price` is the effective buy fill price (slippage included). The ATR
/// series and trade history come from the engine's own precompute pass and
/// ledger, not from an external dependency.
#[derive(Debug, Clone, Copy)]
pub struct SizingContext<'a> {
    pub cash: f64,
    pub price: f64,
    pub commission_rate: f64,
    pub bars: &'a [Bar],
    pub bar_index: usize,
    pub trades: &'a [Trade],
    /// Configured percent stop, when the stop rule is percent-based.
    pub percent_stop: Option<f64>,
    /// Engine-precomputed ATR series, present when any consumer needs it.
    pub atr: Option<&'a [f64]>,
}

impl SizingContext<'_> {
    /// Hard cap shared by all sizers: what the cash can buy once the
    /// buy-leg commission is included in the debit.
    pub fn max_affordable(&self) -> f64 {
        if self.price <= 0.0 || self.cash <= 0.0 {
            return 0.0;
        }
        (self.cash / (self.price * (1.0 + self.commission_rate))).floor()
    }
}

/// Position sizing contract.
pub trait PositionSizer: Send + Sync {
    /// Whole shares to buy for this entry, >= 0.
    fn size(&self, ctx: &SizingContext) -> f64;

    /// Sizer name for reports and logs.
    fn name(&self) -> &str;
}

/// Build the sizer for a config rule. The enum is matched exhaustively;
/// adding a rule without a sizer is a compile error.
pub fn create_sizer(rule: &SizingRule) -> Box<dyn PositionSizer> {
    match *rule {
        SizingRule::Full => Box::new(FullSizer),
        SizingRule::FixedFraction { risk_pct } => Box::new(FixedFractionSizer::new(risk_pct)),
        SizingRule::Kelly { fraction } => Box::new(KellySizer::new(fraction)),
        SizingRule::AtrRisk {
            risk_pct,
            multiplier,
        } => Box::new(AtrRiskSizer::new(risk_pct, multiplier)),
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use chrono::NaiveDate;

    pub fn flat_bars(n: usize, close: f64) -> Vec<Bar> {
        let base = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        (0..n)
            .map(|i| Bar {
                date: base + chrono::Duration::days(i as i64),
                open: close,
                high: close + 1.0,
                low: close - 1.0,
                close,
                volume: 1000,
            })
            .collect()
    }

    pub fn context<'a>(
        cash: f64,
        price: f64,
        bars: &'a [Bar],
        trades: &'a [Trade],
    ) -> SizingContext<'a> {
        SizingContext {
            cash,
            price,
            commission_rate: 0.0003,
            bars,
            bar_index: bars.len().saturating_sub(1),
            trades,
            percent_stop: None,
            atr: None,
        }
    }
}
