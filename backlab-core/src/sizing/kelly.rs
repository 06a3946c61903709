//! Kelly sizer — fractional Kelly from the run's own trade history.

use super::{PositionSizer, SizingContext};
use crate::domain::Trade;

/// Minimum completed trades before the Kelly estimate is trusted.
const MIN_TRADES: usize = 5;
/// Cash fraction used while history is too thin.
const FALLBACK_CASH_PCT: f64 = 0.10;
/// Hard cap on the position value as a fraction of cash.
const MAX_CASH_PCT: f64 = 0.25;

/// Fractional Kelly criterion sizer.
///
/// `full_kelly = win_rate - (1 - win_rate) / (avg_win / avg_loss)` where
/// `avg_win`/`avg_loss` are mean |pnl_pct| of winners/losers. The position
/// value is `cash * full_kelly * fraction`, never more than 25% of cash.
/// With fewer than five completed trades the estimate is noise, so 10% of
/// cash is used instead.
#[derive(Debug, Clone, Copy)]
pub struct KellySizer {
    fraction: f64,
}

impl KellySizer {
    pub fn new(fraction: f64) -> Self {
        Self { fraction }
    }

    fn full_kelly(trades: &[Trade]) -> f64 {
        let winners: Vec<f64> = trades
            .iter()
            .filter(|t| t.is_winner())
            .map(|t| t.pnl_pct)
            .collect();
        let losers: Vec<f64> = trades
            .iter()
            .filter(|t| !t.is_winner())
            .map(|t| t.pnl_pct.abs())
            .collect();

        let win_rate = winners.len() as f64 / trades.len() as f64;
        let avg_win = mean(&winners);
        let avg_loss = mean(&losers);

        if avg_loss <= f64::EPSILON {
            // No losing history: the payoff ratio diverges and the formula
            // degenerates to the win rate.
            return win_rate;
        }
        if avg_win <= f64::EPSILON {
            return 0.0;
        }
        win_rate - (1.0 - win_rate) / (avg_win / avg_loss)
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

impl PositionSizer for KellySizer {
    fn size(&self, ctx: &SizingContext) -> f64 {
        if ctx.cash <= 0.0 || ctx.price <= 0.0 || self.fraction <= 0.0 {
            return 0.0;
        }

        let position_value = if ctx.trades.len() < MIN_TRADES {
            ctx.cash * FALLBACK_CASH_PCT
        } else {
            let kelly = Self::full_kelly(ctx.trades);
            if kelly <= 0.0 {
                return 0.0;
            }
            (ctx.cash * kelly * self.fraction).min(ctx.cash * MAX_CASH_PCT)
        };

        (position_value / ctx.price)
            .floor()
            .min(ctx.max_affordable())
    }

    fn name(&self) -> &str {
        "kelly"
    }
}
