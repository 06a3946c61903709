//! ATR risk sizer — volatility-scaled position size.

use super::{PositionSizer, SizingContext};
use crate::indicators::atr_value;

/// Cash fraction used when the ATR is not yet warm.
const FALLBACK_CASH_PCT: f64 = 0.10;

/// Risks `risk_pct` of cash against a stop `multiplier` ATRs away:
/// `shares = floor(cash * risk_pct / (multiplier * atr))`.
///
/// Reads the engine's precomputed 14-bar Wilder ATR series. When the series
/// is absent or not warm at the entry bar, 10% of cash is used instead of
/// refusing the trade.
#[derive(Debug, Clone, Copy)]
pub struct AtrRiskSizer {
    risk_pct: f64,
    multiplier: f64,
}

impl AtrRiskSizer {
    pub fn new(risk_pct: f64, multiplier: f64) -> Self {
        Self {
            risk_pct,
            multiplier,
        }
    }
}

impl PositionSizer for AtrRiskSizer {
    fn size(&self, ctx: &SizingContext) -> f64 {
        if ctx.cash <= 0.0 || ctx.price <= 0.0 || self.risk_pct <= 0.0 || self.multiplier <= 0.0 {
            return 0.0;
        }

        let shares = match ctx.atr.and_then(|series| atr_value(series, ctx.bar_index)) {
            Some(atr) => {
                let stop_distance = self.multiplier * atr;
                (ctx.cash * self.risk_pct / stop_distance).floor()
            }
            None => (ctx.cash * FALLBACK_CASH_PCT / ctx.price).floor(),
        };

        shares.min(ctx.max_affordable())
    }

    fn name(&self) -> &str {
        "atr_risk"
    }
}
