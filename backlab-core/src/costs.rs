//! Cost model — commission, direction-aware slippage, sell-side stamp duty.
//!
//! All three costs are applied additively when computing net proceeds or
//! all-in entry cost. Commission hits both legs; stamp duty only the sell.

use crate::config::BacktestConfig;

/// Pure per-run cost parameters, lifted out of the config once at the start
/// of the loop.
#[derive(Debug, Clone, Copy)]
pub struct CostModel {
    pub commission_rate: f64,
    pub slippage_rate: f64,
    pub stamp_duty_rate: f64,
}

impl CostModel {
    pub fn from_config(config: &BacktestConfig) -> Self {
        Self {
            commission_rate: config.commission_rate,
            slippage_rate: config.slippage_rate,
            stamp_duty_rate: config.stamp_duty_rate,
        }
    }

    /// Buy-side fill price: slippage pushes the fill above the quote.
    pub fn buy_price(&self, price: f64) -> f64 {
        price * (1.0 + self.slippage_rate)
    }

    /// Sell-side fill price: slippage pushes the fill below the quote.
    pub fn sell_price(&self, price: f64) -> f64 {
        price * (1.0 - self.slippage_rate)
    }

    pub fn commission(&self, amount: f64) -> f64 {
        amount * self.commission_rate
    }

    /// Sell-side transaction tax.
    pub fn stamp_duty(&self, amount: f64) -> f64 {
        amount * self.stamp_duty_rate
    }

    /// All-in cash debit for entering `shares` at a buy fill price.
    pub fn entry_cost(&self, shares: f64, fill_price: f64) -> f64 {
        shares * fill_price * (1.0 + self.commission_rate)
    }

    /// Net cash credit for exiting `shares` at a sell fill price:
    /// gross minus commission minus stamp duty.
    pub fn net_proceeds(&self, shares: f64, fill_price: f64) -> f64 {
        let gross = shares * fill_price;
        gross - self.commission(gross) - self.stamp_duty(gross)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model() -> CostModel {
        CostModel {
            commission_rate: 0.0003,
            slippage_rate: 0.001,
            stamp_duty_rate: 0.001,
        }
    }

    #[test]
    fn buy_slippage_raises_price() {
        assert!((model().buy_price(10.0) - 10.01).abs() < 1e-12);
    }

    #[test]
    fn sell_slippage_lowers_price() {
        assert!((model().sell_price(11.0) - 10.989).abs() < 1e-12);
    }

    #[test]
    fn entry_cost_includes_commission() {
        let m = model();
        let cost = m.entry_cost(100.0, 10.01);
        assert!((cost - 100.0 * 10.01 * 1.0003).abs() < 1e-9);
    }

    #[test]
    fn net_proceeds_subtract_commission_and_stamp_duty() {
        let m = model();
        let gross = 100.0 * 10.989;
        let expected = gross - gross * 0.0003 - gross * 0.001;
        assert!((m.net_proceeds(100.0, 10.989) - expected).abs() < 1e-9);
    }

    #[test]
    fn stamp_duty_never_applies_on_entry() {
        // Entry cost uses commission only; stamp duty is the sell leg's.
        let m = model();
        let cost = m.entry_cost(1.0, 100.0);
        assert!((cost - 100.0 * 1.0003).abs() < 1e-9);
    }
}
