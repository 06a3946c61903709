//! Performance metrics — pure functions over the equity curve and trade list.
//!
//! Every metric is a pure function: equity curve and/or trades in, scalar
//! out. Numeric edge cases degrade to safe defaults (zero volatility →
//! Sharpe 0, no trades → win rate 0). Ratios with a zero denominator and a
//! positive numerator are a genuine +∞ and stay that way — serialized as an
//! explicit `"inf"` sentinel, never clamped and never NaN.

use serde::{Deserialize, Serialize};

use crate::domain::{EquityPoint, Trade};

/// Fixed annual risk-free rate used in the Sharpe ratio.
pub const RISK_FREE_RATE: f64 = 0.025;
/// Trading days per year for annualization.
pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;
/// Decimal places kept on every reported metric.
const ROUND_DECIMALS: i32 = 6;

/// Aggregate summary of a completed run. Immutable, derived once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    pub total_return: f64,
    pub annualized_return: f64,
    pub sharpe_ratio: f64,
    /// Negative fraction, e.g. -0.15 for a 15% drawdown.
    pub max_drawdown: f64,
    /// Longest stretch of bars spent under a prior equity peak.
    pub max_drawdown_duration: usize,
    pub total_trades: usize,
    pub winning_trades: usize,
    pub win_rate: f64,
    #[serde(with = "sentinel")]
    pub profit_factor: f64,
    #[serde(with = "sentinel")]
    pub calmar_ratio: f64,
    pub avg_hold_days: f64,
    pub avg_win_pnl: f64,
    pub avg_loss_pnl: f64,
}

impl Metrics {
    /// Compute all metrics for a finished run.
    pub fn compute(equity_curve: &[EquityPoint], trades: &[Trade], initial_capital: f64) -> Self {
        let equity: Vec<f64> = equity_curve.iter().map(|p| p.equity).collect();
        let total_return = total_return(&equity, initial_capital);
        let annualized = annualized_return(&equity, initial_capital);
        let (max_dd, max_dd_duration) = drawdown_stats(&equity);
        let winning = trades.iter().filter(|t| t.is_winner()).count();

        Self {
            total_return: round(total_return),
            annualized_return: round(annualized),
            sharpe_ratio: round(sharpe_ratio(&equity, annualized)),
            max_drawdown: round(max_dd),
            max_drawdown_duration: max_dd_duration,
            total_trades: trades.len(),
            winning_trades: winning,
            win_rate: round(win_rate(trades)),
            profit_factor: round(profit_factor(trades)),
            calmar_ratio: round(calmar_ratio(annualized, max_dd)),
            avg_hold_days: round(avg_hold_days(trades)),
            avg_win_pnl: round(avg_win_pnl(trades)),
            avg_loss_pnl: round(avg_loss_pnl(trades)),
        }
    }
}

// ─── Individual metric functions ────────────────────────────────────

/// Total return as a fraction of initial capital.
pub fn total_return(equity: &[f64], initial_capital: f64) -> f64 {
    if equity.is_empty() || initial_capital <= 0.0 {
        return 0.0;
    }
    let final_eq = *equity.last().unwrap();
    (final_eq - initial_capital) / initial_capital
}

/// Annualized return: `(final / initial) ^ (252 / trading_days) - 1`.
/// Returns 0.0 for an empty curve.
pub fn annualized_return(equity: &[f64], initial_capital: f64) -> f64 {
    let trading_days = equity.len();
    if trading_days == 0 || initial_capital <= 0.0 {
        return 0.0;
    }
    let final_eq = *equity.last().unwrap();
    if final_eq <= 0.0 {
        return 0.0;
    }
    (final_eq / initial_capital).powf(TRADING_DAYS_PER_YEAR / trading_days as f64) - 1.0
}

/// Annualized Sharpe: `(annualized_return - rf) / (daily_std * sqrt(252))`,
/// with the fixed 2.5% risk-free rate. Zero when volatility is zero.
pub fn sharpe_ratio(equity: &[f64], annualized_return: f64) -> f64 {
    let returns = daily_returns(equity);
    let std = std_dev(&returns);
    if std < 1e-15 {
        return 0.0;
    }
    (annualized_return - RISK_FREE_RATE) / (std * TRADING_DAYS_PER_YEAR.sqrt())
}

/// Running-peak drawdown scan: returns (max_drawdown, max_duration).
///
/// `max_drawdown` is the most negative `(equity - peak) / peak`. Duration
/// counts bars from the first under-peak bar of a drawdown to its current
/// bar, tracked in O(1) per bar without re-scanning.
pub fn drawdown_stats(equity: &[f64]) -> (f64, usize) {
    let mut peak = f64::MIN;
    let mut max_dd = 0.0_f64;
    let mut max_duration = 0_usize;
    let mut dd_start: Option<usize> = None;

    for (i, &eq) in equity.iter().enumerate() {
        if eq > peak {
            peak = eq;
            dd_start = None;
        }
        if peak <= 0.0 {
            continue;
        }
        let dd = (eq - peak) / peak;
        if dd < 0.0 && dd_start.is_none() {
            dd_start = Some(i);
        }
        if dd < max_dd {
            max_dd = dd;
        }
        if let Some(start) = dd_start {
            max_duration = max_duration.max(i - start);
        }
    }
    (max_dd, max_duration)
}

/// Fraction of trades that were winners. Zero with no trades.
pub fn win_rate(trades: &[Trade]) -> f64 {
    if trades.is_empty() {
        return 0.0;
    }
    let winners = trades.iter().filter(|t| t.is_winner()).count();
    winners as f64 / trades.len() as f64
}

/// Gross profit over gross loss. +∞ when there are profits but no losses,
/// 0 when there is neither.
pub fn profit_factor(trades: &[Trade]) -> f64 {
    let gross_profit: f64 = trades.iter().filter(|t| t.pnl > 0.0).map(|t| t.pnl).sum();
    let gross_loss: f64 = trades
        .iter()
        .filter(|t| t.pnl < 0.0)
        .map(|t| t.pnl.abs())
        .sum();

    if gross_loss == 0.0 {
        return if gross_profit > 0.0 {
            f64::INFINITY
        } else {
            0.0
        };
    }
    gross_profit / gross_loss
}

/// Annualized return over drawdown magnitude. +∞ when the run never drew
/// down but still returned positive; 0 when it neither drew down nor gained.
pub fn calmar_ratio(annualized_return: f64, max_drawdown: f64) -> f64 {
    if max_drawdown == 0.0 {
        return if annualized_return > 0.0 {
            f64::INFINITY
        } else {
            0.0
        };
    }
    annualized_return / max_drawdown.abs()
}

/// Mean bars held per trade. Zero with no trades.
pub fn avg_hold_days(trades: &[Trade]) -> f64 {
    if trades.is_empty() {
        return 0.0;
    }
    trades.iter().map(|t| t.hold_days as f64).sum::<f64>() / trades.len() as f64
}

/// Mean `pnl_pct` of winning trades. Zero if there are none.
pub fn avg_win_pnl(trades: &[Trade]) -> f64 {
    let winners: Vec<f64> = trades
        .iter()
        .filter(|t| t.is_winner())
        .map(|t| t.pnl_pct)
        .collect();
    mean(&winners)
}

/// Mean `pnl_pct` of losing trades (a negative number). Zero if none.
pub fn avg_loss_pnl(trades: &[Trade]) -> f64 {
    let losers: Vec<f64> = trades
        .iter()
        .filter(|t| !t.is_winner())
        .map(|t| t.pnl_pct)
        .collect();
    mean(&losers)
}

// ─── Helpers ────────────────────────────────────────────────────────

/// Daily returns from consecutive equity values.
pub fn daily_returns(equity: &[f64]) -> Vec<f64> {
    if equity.len() < 2 {
        return Vec::new();
    }
    equity
        .windows(2)
        .map(|w| if w[0] > 0.0 { (w[1] - w[0]) / w[0] } else { 0.0 })
        .collect()
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation (n - 1 denominator).
fn std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let variance = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    variance.sqrt()
}

/// Round to the reporting precision, preserving infinities.
fn round(value: f64) -> f64 {
    if !value.is_finite() {
        return value;
    }
    let factor = 10_f64.powi(ROUND_DECIMALS);
    (value * factor).round() / factor
}

/// Serde adapter for metrics that may legitimately be infinite: infinities
/// become the strings `"inf"` / `"-inf"` instead of JSON null.
mod sentinel {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if value.is_finite() {
            serializer.serialize_f64(*value)
        } else if *value > 0.0 {
            serializer.serialize_str("inf")
        } else {
            serializer.serialize_str("-inf")
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Num(f64),
            Text(String),
        }
        match Raw::deserialize(deserializer)? {
            Raw::Num(v) => Ok(v),
            Raw::Text(t) => match t.as_str() {
                "inf" => Ok(f64::INFINITY),
                "-inf" => Ok(f64::NEG_INFINITY),
                other => Err(serde::de::Error::custom(format!(
                    "expected a number, \"inf\", or \"-inf\", got {other:?}"
                ))),
            },
        }
    }
}
