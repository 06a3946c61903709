//! Average True Range — the one indicator the engine computes for itself.
//!
//! True Range: max(high-low, |high-prev_close|, |low-prev_close|).
//! ATR uses Wilder smoothing (alpha = 1/period), seeded with the mean of the
//! first `period` true-range values. Values before the seed are NaN.
//!
//! The ATR stop rule and the ATR sizer both read this series; general
//! indicator math is a collaborator concern and lives outside this crate.

use crate::domain::Bar;

/// Default ATR window used by the stop rule and sizer.
pub const ATR_PERIOD: usize = 14;

/// Compute the True Range series.
/// TR[0] = high[0] - low[0] (no previous close).
pub fn true_range(bars: &[Bar]) -> Vec<f64> {
    let n = bars.len();
    let mut tr = vec![f64::NAN; n];
    if n == 0 {
        return tr;
    }

    tr[0] = bars[0].high - bars[0].low;
    for i in 1..n {
        let h = bars[i].high;
        let l = bars[i].low;
        let pc = bars[i - 1].close;
        tr[i] = (h - l).max((h - pc).abs()).max((l - pc).abs());
    }
    tr
}

/// Wilder-smoothed ATR over `period` bars.
///
/// Index `period - 1` holds the seed (simple mean of the first `period` TR
/// values); earlier indices are NaN. Subsequent values follow
/// `atr[t] = (atr[t-1] * (period - 1) + tr[t]) / period`.
pub fn atr(bars: &[Bar], period: usize) -> Vec<f64> {
    let n = bars.len();
    let mut out = vec![f64::NAN; n];
    if period == 0 || n < period {
        return out;
    }

    let tr = true_range(bars);
    let seed: f64 = tr[..period].iter().sum::<f64>() / period as f64;
    out[period - 1] = seed;
    for i in period..n {
        out[i] = (out[i - 1] * (period - 1) as f64 + tr[i]) / period as f64;
    }
    out
}

/// Value from a precomputed ATR series at `index`, if warm and positive.
pub fn atr_value(series: &[f64], index: usize) -> Option<f64> {
    match series.get(index) {
        Some(&v) if v.is_finite() && v > 0.0 => Some(v),
        _ => None,
    }
}
