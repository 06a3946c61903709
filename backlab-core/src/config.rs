//! Backtest configuration — tagged sum types with documented defaults.
//!
//! Stop-loss and sizing rules are proper enums with payload, matched
//! exhaustively at the use sites. Missing fields fall back to defaults at
//! deserialization time; there is no validation failure path — inputs are
//! treated as trusted.

use serde::{Deserialize, Serialize};

/// Stop-loss rule variants.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StopRule {
    /// Fixed percent below the entry fill price.
    Percent { pct: f64 },
    /// `multiplier` ATRs (14-bar Wilder) below the entry fill price.
    Atr { multiplier: f64 },
    /// Percent below the highest high seen since entry; ratchets up only.
    Trailing { pct: f64 },
}

/// Take-profit rule variants. Percent-above-entry is the only one today,
/// kept as an enum so the config format is stable if more arrive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TakeProfitRule {
    Percent { pct: f64 },
}

/// Position-sizing rule variants.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SizingRule {
    /// All available cash, commission-adjusted.
    Full,
    /// Risk a fixed fraction of cash against the configured percent stop.
    FixedFraction { risk_pct: f64 },
    /// Fractional Kelly from the run's own trade history.
    Kelly { fraction: f64 },
    /// Risk a fixed fraction of cash against an ATR-multiple stop distance.
    AtrRisk { risk_pct: f64, multiplier: f64 },
}

impl Default for SizingRule {
    fn default() -> Self {
        SizingRule::Full
    }
}

fn default_initial_capital() -> f64 {
    100_000.0
}

fn default_commission_rate() -> f64 {
    0.0003
}

fn default_slippage_rate() -> f64 {
    0.001
}

fn default_stamp_duty_rate() -> f64 {
    0.001
}

/// Configuration for a single backtest run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestConfig {
    #[serde(default = "default_initial_capital")]
    pub initial_capital: f64,
    /// Commission rate, applied on both the buy and sell legs.
    #[serde(default = "default_commission_rate")]
    pub commission_rate: f64,
    /// Directional slippage: buys fill above the quoted price, sells below.
    #[serde(default = "default_slippage_rate")]
    pub slippage_rate: f64,
    /// Transaction tax on the sell leg only.
    #[serde(default = "default_stamp_duty_rate")]
    pub stamp_duty_rate: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_loss: Option<StopRule>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub take_profit: Option<TakeProfitRule>,
    /// Force-exit after this many bars in a position.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_hold_bars: Option<usize>,
    #[serde(default)]
    pub sizing: SizingRule,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self {
            initial_capital: default_initial_capital(),
            commission_rate: default_commission_rate(),
            slippage_rate: default_slippage_rate(),
            stamp_duty_rate: default_stamp_duty_rate(),
            stop_loss: None,
            take_profit: None,
            max_hold_bars: None,
            sizing: SizingRule::Full,
        }
    }
}

impl BacktestConfig {
    /// The configured percent stop, if the stop rule is percent-based.
    /// Used by the fixed-fraction sizer to derive per-share risk.
    pub fn percent_stop(&self) -> Option<f64> {
        match self.stop_loss {
            Some(StopRule::Percent { pct }) => Some(pct),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = BacktestConfig::default();
        assert_eq!(config.initial_capital, 100_000.0);
        assert_eq!(config.commission_rate, 0.0003);
        assert_eq!(config.slippage_rate, 0.001);
        assert_eq!(config.stamp_duty_rate, 0.001);
        assert!(config.stop_loss.is_none());
        assert!(config.take_profit.is_none());
        assert!(config.max_hold_bars.is_none());
        assert_eq!(config.sizing, SizingRule::Full);
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let config: BacktestConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, BacktestConfig::default());
    }

    #[test]
    fn tagged_stop_rule_roundtrip() {
        let config = BacktestConfig {
            stop_loss: Some(StopRule::Trailing { pct: 0.08 }),
            take_profit: Some(TakeProfitRule::Percent { pct: 0.15 }),
            sizing: SizingRule::AtrRisk {
                risk_pct: 0.02,
                multiplier: 2.0,
            },
            ..Default::default()
        };
        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("\"type\":\"trailing\""));
        let deser: BacktestConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config, deser);
    }

    #[test]
    fn percent_stop_only_for_percent_rule() {
        let mut config = BacktestConfig {
            stop_loss: Some(StopRule::Percent { pct: 0.05 }),
            ..Default::default()
        };
        assert_eq!(config.percent_stop(), Some(0.05));

        config.stop_loss = Some(StopRule::Atr { multiplier: 2.0 });
        assert_eq!(config.percent_stop(), None);

        config.stop_loss = None;
        assert_eq!(config.percent_stop(), None);
    }
}
