//! Trade — a completed round-trip ledger entry.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Why a position was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitReason {
    StopLoss,
    TakeProfit,
    MaxHold,
    Signal,
}

impl std::fmt::Display for ExitReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ExitReason::StopLoss => "stop loss",
            ExitReason::TakeProfit => "take profit",
            ExitReason::MaxHold => "max holding period",
            ExitReason::Signal => "strategy signal",
        };
        f.write_str(s)
    }
}

/// Side of a trade. The engine is long-only; the field exists so the ledger
/// format does not change if shorts ever arrive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TradeSide {
    Long,
}

/// A complete round-trip trade: entry → exit, immutable once appended.
///
/// `pnl` is net of commission on both legs, slippage, and sell-side stamp
/// duty. `pnl_pct` is relative to the all-in entry cost. `hold_days` counts
/// bars, not calendar days.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trade {
    pub entry_date: NaiveDate,
    pub entry_price: f64,
    pub exit_date: NaiveDate,
    pub exit_price: f64,
    pub shares: f64,
    pub pnl: f64,
    pub pnl_pct: f64,
    pub hold_days: usize,
    pub side: TradeSide,
    pub exit_reason: ExitReason,
}

impl Trade {
    pub fn is_winner(&self) -> bool {
        self.pnl > 0.0
    }
}
