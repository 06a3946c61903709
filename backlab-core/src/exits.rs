//! Exit-condition evaluator — stop-loss, take-profit, max holding period.
//!
//! Evaluated once per bar while a position is open, before any new signal is
//! processed, in fixed priority: stop-loss, then take-profit, then max
//! holding period. The first trigger closes the full position at that bar
//! and suppresses entry-signal processing for the same bar.
//!
//! The trailing ratchet itself lives on `OpenPosition` and is advanced by
//! the engine after the exit check, so a bar's stop test always sees the
//! ratchet as of the previous bar.

use crate::config::{BacktestConfig, StopRule, TakeProfitRule};
use crate::costs::CostModel;
use crate::domain::{Bar, ExitReason, OpenPosition};
use crate::indicators::atr_value;

/// A fired exit: why, and the sell-side fill price (slippage included).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExitTrigger {
    pub reason: ExitReason,
    pub price: f64,
}

/// Check the configured exit conditions for the current bar.
///
/// Stop and take-profit fills use the threshold price bounded by the bar's
/// actual range: a stop fills at `max(low, stop)`, a take-profit at
/// `min(high, target)`, each with sell-side slippage applied. A max-hold
/// exit fills at the close.
///
/// `atr` is the engine's precomputed ATR series; the ATR stop rule stays
/// disarmed when it is absent or not yet warm at `index`.
pub fn evaluate_exit(
    position: &OpenPosition,
    bars: &[Bar],
    index: usize,
    config: &BacktestConfig,
    costs: &CostModel,
    atr: Option<&[f64]>,
) -> Option<ExitTrigger> {
    let bar = &bars[index];

    // 1. Stop-loss
    if let Some(rule) = config.stop_loss {
        let stop_price = match rule {
            StopRule::Percent { pct } => Some(position.entry_price * (1.0 - pct)),
            StopRule::Atr { multiplier } => atr
                .and_then(|series| atr_value(series, index))
                .map(|atr| position.entry_price - multiplier * atr),
            StopRule::Trailing { .. } => position.trailing_stop,
        };
        if let Some(stop) = stop_price {
            if bar.low <= stop {
                return Some(ExitTrigger {
                    reason: ExitReason::StopLoss,
                    price: costs.sell_price(stop.max(bar.low)),
                });
            }
        }
    }

    // 2. Take-profit
    if let Some(TakeProfitRule::Percent { pct }) = config.take_profit {
        let target = position.entry_price * (1.0 + pct);
        if bar.high >= target {
            return Some(ExitTrigger {
                reason: ExitReason::TakeProfit,
                price: costs.sell_price(target.min(bar.high)),
            });
        }
    }

    // 3. Max holding period
    if let Some(max_hold) = config.max_hold_bars {
        if index - position.entry_index >= max_hold {
            return Some(ExitTrigger {
                reason: ExitReason::MaxHold,
                price: costs.sell_price(bar.close),
            });
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{atr, ATR_PERIOD};
    use chrono::NaiveDate;

    fn make_bar(day: u32, high: f64, low: f64, close: f64) -> Bar {
        Bar {
            date: NaiveDate::from_ymd_opt(2024, 1, day).unwrap(),
            open: close,
            high,
            low,
            close,
            volume: 1000,
        }
    }

    fn costs() -> CostModel {
        CostModel {
            commission_rate: 0.0003,
            slippage_rate: 0.001,
            stamp_duty_rate: 0.001,
        }
    }

    fn position(entry_price: f64) -> OpenPosition {
        OpenPosition::new(
            NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
            entry_price,
            0,
            100.0,
        )
    }

    #[test]
    fn percent_stop_triggers_on_low_breach() {
        let config = BacktestConfig {
            stop_loss: Some(StopRule::Percent { pct: 0.05 }),
            ..Default::default()
        };
        let bars = vec![make_bar(2, 101.0, 94.0, 96.0)];
        let trigger = evaluate_exit(&position(100.0), &bars, 0, &config, &costs(), None).unwrap();
        assert_eq!(trigger.reason, ExitReason::StopLoss);
        // Fill at the stop (95.0) with sell slippage
        assert!((trigger.price - 95.0 * 0.999).abs() < 1e-9);
    }

    #[test]
    fn percent_stop_quiet_above_threshold() {
        let config = BacktestConfig {
            stop_loss: Some(StopRule::Percent { pct: 0.05 }),
            ..Default::default()
        };
        let bars = vec![make_bar(2, 101.0, 96.0, 98.0)];
        assert!(evaluate_exit(&position(100.0), &bars, 0, &config, &costs(), None).is_none());
    }

    #[test]
    fn stop_beats_take_profit_on_the_same_bar() {
        let config = BacktestConfig {
            stop_loss: Some(StopRule::Percent { pct: 0.05 }),
            take_profit: Some(TakeProfitRule::Percent { pct: 0.05 }),
            ..Default::default()
        };
        // Wide bar breaching both the stop (95) and the target (105)
        let bars = vec![make_bar(2, 106.0, 94.0, 100.0)];
        let trigger = evaluate_exit(&position(100.0), &bars, 0, &config, &costs(), None).unwrap();
        assert_eq!(trigger.reason, ExitReason::StopLoss);
    }

    #[test]
    fn take_profit_fills_at_target() {
        let config = BacktestConfig {
            take_profit: Some(TakeProfitRule::Percent { pct: 0.10 }),
            ..Default::default()
        };
        let bars = vec![make_bar(2, 112.0, 105.0, 108.0)];
        let trigger = evaluate_exit(&position(100.0), &bars, 0, &config, &costs(), None).unwrap();
        assert_eq!(trigger.reason, ExitReason::TakeProfit);
        assert!((trigger.price - 110.0 * 0.999).abs() < 1e-9);
    }

    #[test]
    fn trailing_stop_uses_position_ratchet() {
        let config = BacktestConfig {
            stop_loss: Some(StopRule::Trailing { pct: 0.10 }),
            ..Default::default()
        };
        let mut pos = position(100.0);
        pos.trailing_stop = Some(108.0); // ratcheted from a 120 high
        let bars = vec![make_bar(2, 110.0, 107.0, 109.0)];
        let trigger = evaluate_exit(&pos, &bars, 0, &config, &costs(), None).unwrap();
        assert_eq!(trigger.reason, ExitReason::StopLoss);
        assert!((trigger.price - 108.0 * 0.999).abs() < 1e-9);
    }

    #[test]
    fn trailing_stop_without_ratchet_is_quiet() {
        let config = BacktestConfig {
            stop_loss: Some(StopRule::Trailing { pct: 0.10 }),
            ..Default::default()
        };
        let bars = vec![make_bar(2, 110.0, 90.0, 100.0)];
        assert!(evaluate_exit(&position(100.0), &bars, 0, &config, &costs(), None).is_none());
    }

    #[test]
    fn max_hold_exits_at_close() {
        let config = BacktestConfig {
            max_hold_bars: Some(3),
            ..Default::default()
        };
        let bars: Vec<Bar> = (0..4)
            .map(|i| make_bar(2 + i as u32, 101.0, 99.0, 100.0))
            .collect();
        assert!(evaluate_exit(&position(100.0), &bars, 2, &config, &costs(), None).is_none());
        let trigger = evaluate_exit(&position(100.0), &bars, 3, &config, &costs(), None).unwrap();
        assert_eq!(trigger.reason, ExitReason::MaxHold);
        assert!((trigger.price - 100.0 * 0.999).abs() < 1e-9);
    }

    #[test]
    fn atr_stop_requires_warm_atr() {
        let config = BacktestConfig {
            stop_loss: Some(StopRule::Atr { multiplier: 2.0 }),
            ..Default::default()
        };
        // Too few bars for a 14-bar ATR: stop never arms
        let bars = vec![make_bar(2, 101.0, 80.0, 85.0)];
        let series = atr(&bars, ATR_PERIOD);
        let trigger = evaluate_exit(&position(100.0), &bars, 0, &config, &costs(),
                                    Some(&series));
        assert!(trigger.is_none());
    }

    #[test]
    fn atr_stop_triggers_once_warm() {
        let config = BacktestConfig {
            stop_loss: Some(StopRule::Atr { multiplier: 2.0 }),
            ..Default::default()
        };
        // 20 flat bars with TR = 2.0, then a plunge
        let mut bars: Vec<Bar> = (0..20)
            .map(|i| make_bar(2 + i as u32, 101.0, 99.0, 100.0))
            .collect();
        bars.push(make_bar(22, 100.0, 90.0, 92.0));
        let series = atr(&bars, ATR_PERIOD);
        let index = bars.len() - 1;
        let trigger = evaluate_exit(&position(100.0), &bars, index, &config, &costs(),
                                    Some(&series))
            .unwrap();
        assert_eq!(trigger.reason, ExitReason::StopLoss);
    }
}
