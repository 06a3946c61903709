//! EquityPoint — one mark-to-market observation per bar.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Single point on the equity curve.
///
/// `equity = cash + shares * close` at end of bar. `drawdown` is measured
/// against the running equity peak and is always <= 0. `benchmark` is the
/// buy-and-hold value of the initial capital from the first bar's close.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquityPoint {
    pub date: NaiveDate,
    pub equity: f64,
    pub drawdown: f64,
    pub benchmark: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equity_point_serialization_roundtrip() {
        let point = EquityPoint {
            date: NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
            equity: 101_250.0,
            drawdown: -0.0125,
            benchmark: 100_400.0,
        };
        let json = serde_json::to_string(&point).unwrap();
        let deser: EquityPoint = serde_json::from_str(&json).unwrap();
        assert_eq!(point, deser);
    }
}
