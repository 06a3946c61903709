//! Signals — per-bar trading instructions and the date-keyed lookup book.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// What a strategy wants done on a given bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalAction {
    Buy,
    Sell,
    Hold,
}

/// A per-bar trading instruction produced by a strategy.
///
/// Strategies emit exactly one signal per bar, using `Hold` for
/// non-actionable bars; the engine itself is strategy-agnostic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Signal {
    pub date: NaiveDate,
    pub action: SignalAction,
    pub price: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl Signal {
    pub fn is_actionable(&self) -> bool {
        self.action != SignalAction::Hold
    }
}

/// Date-keyed signal lookup, built once before the bar loop.
///
/// Holds are discarded at construction. If the caller supplies more than one
/// actionable signal for the same date, the first one wins; supplying
/// duplicates at all is a caller error the engine does not detect.
/// Construction is O(n); per-bar lookup is O(1) amortized.
#[derive(Debug, Clone, Default)]
pub struct SignalBook {
    by_date: HashMap<NaiveDate, Signal>,
}

impl SignalBook {
    pub fn build(signals: &[Signal]) -> Self {
        let mut by_date = HashMap::new();
        for signal in signals {
            if !signal.is_actionable() {
                continue;
            }
            by_date.entry(signal.date).or_insert_with(|| signal.clone());
        }
        Self { by_date }
    }

    pub fn get(&self, date: NaiveDate) -> Option<&Signal> {
        self.by_date.get(&date)
    }

    /// Number of actionable (non-hold) signals in the book.
    pub fn len(&self) -> usize {
        self.by_date.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_date.is_empty()
    }
}
