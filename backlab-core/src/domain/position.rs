//! OpenPosition — transient engine-internal state for the single open long.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// The one open position the engine may hold at a time.
///
/// Created on entry, consumed on exit. No pyramiding, no shorting: while an
/// instance exists, further buy signals are no-ops.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenPosition {
    pub entry_date: NaiveDate,
    /// Buy-side fill price, slippage included.
    pub entry_price: f64,
    pub entry_index: usize,
    pub shares: f64,
    /// Trailing-stop ratchet. Only maintained when the config uses a
    /// trailing stop; moves up with new highs, never down.
    pub trailing_stop: Option<f64>,
}

impl OpenPosition {
    pub fn new(entry_date: NaiveDate, entry_price: f64, entry_index: usize, shares: f64) -> Self {
        Self {
            entry_date,
            entry_price,
            entry_index,
            shares,
            trailing_stop: None,
        }
    }

    /// Ratchet the trailing stop against a new bar high. The stop only ever
    /// rises; a lower candidate leaves it untouched.
    pub fn ratchet_trailing_stop(&mut self, bar_high: f64, trail_pct: f64) {
        let candidate = bar_high * (1.0 - trail_pct);
        self.trailing_stop = Some(match self.trailing_stop {
            Some(current) => current.max(candidate),
            None => candidate,
        });
    }
}
