//! Fixed-fractional sizer — risk a fixed slice of cash per trade.

use super::{PositionSizer, SizingContext};

/// Fallback per-share risk when no percent stop is configured.
const DEFAULT_STOP_PCT: f64 = 0.05;

/// Risks `risk_pct` of cash against the configured percent stop:
/// `shares = floor(cash * risk_pct / (price * stop_pct))`, capped by what
/// the cash can buy. A 5% stop is assumed when the config has none (or a
/// non-percent stop rule).
#[derive(Debug, Clone, Copy)]
pub struct FixedFractionSizer {
    risk_pct: f64,
}

impl FixedFractionSizer {
    pub fn new(risk_pct: f64) -> Self {
        Self { risk_pct }
    }
}

impl PositionSizer for FixedFractionSizer {
    fn size(&self, ctx: &SizingContext) -> f64 {
        if ctx.cash <= 0.0 || ctx.price <= 0.0 || self.risk_pct <= 0.0 {
            return 0.0;
        }
        let stop_pct = ctx.percent_stop.unwrap_or(DEFAULT_STOP_PCT);
        let per_share_risk = ctx.price * stop_pct;
        if per_share_risk <= 0.0 {
            return 0.0;
        }
        let risk_amount = ctx.cash * self.risk_pct;
        (risk_amount / per_share_risk).floor().min(ctx.max_affordable())
    }

    fn name(&self) -> &str {
        "fixed_fraction"
    }
}
