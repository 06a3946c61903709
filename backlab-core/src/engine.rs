//! Bar-by-bar execution state machine — the heart of the engine.
//!
//! Per-bar order of operations:
//! 1. Exit evaluation (stop-loss, take-profit, max hold) while Long; a fired
//!    exit closes the position, records equity, and ends the bar — the same
//!    bar's entry signal, if any, is dropped, not deferred.
//! 2. Trailing-stop ratchet update from the bar's high.
//! 3. Signal processing: Flat + buy → enter; Long + sell → close.
//! 4. Mark-to-market: equity, benchmark, running peak, drawdown, one
//!    `EquityPoint` per bar.
//!
//! The whole run is a pure, synchronous, single-threaded function over its
//! inputs: no I/O, no shared state, no suspension points. Independent runs
//! parallelize trivially from the caller's side.

use serde::{Deserialize, Serialize};

use crate::config::{BacktestConfig, SizingRule, StopRule};
use crate::costs::CostModel;
use crate::domain::{Bar, EquityPoint, ExitReason, OpenPosition, Signal, SignalAction, SignalBook,
                    Trade, TradeSide};
use crate::exits::evaluate_exit;
use crate::indicators::{atr, ATR_PERIOD};
use crate::metrics::Metrics;
use crate::sizing::{create_sizer, SizingContext};

/// Optional collaborator hook for exchange-style execution constraints
/// (T+1 settlement, price limits, trading halts). The engine itself carries
/// no exchange rules; a vetoed entry is simply skipped and a vetoed exit
/// leaves the position open for later bars.
pub trait TradeGate {
    fn allow_entry(&self, bars: &[Bar], index: usize) -> bool {
        let _ = (bars, index);
        true
    }

    fn allow_exit(&self, bars: &[Bar], index: usize) -> bool {
        let _ = (bars, index);
        true
    }
}

/// Everything a run produces: ledger, curve, summary, and the actionable
/// signals that drove it (for chart overlays and downstream analyses).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestReport {
    pub trades: Vec<Trade>,
    pub equity_curve: Vec<EquityPoint>,
    pub metrics: Metrics,
    pub signals: Vec<Signal>,
    pub final_equity: f64,
}

/// Run a backtest without execution constraints.
pub fn run_backtest(bars: &[Bar], signals: &[Signal], config: &BacktestConfig) -> BacktestReport {
    run_backtest_with_gate(bars, signals, config, None)
}

/// Run a backtest with an optional trade gate consulted before every entry
/// and exit fill.
pub fn run_backtest_with_gate(
    bars: &[Bar],
    signals: &[Signal],
    config: &BacktestConfig,
    gate: Option<&dyn TradeGate>,
) -> BacktestReport {
    let book = SignalBook::build(signals);
    let costs = CostModel::from_config(config);
    let sizer = create_sizer(&config.sizing);

    // ATR is computed once up front when any consumer needs it; the exit
    // evaluator and the sizer index into the same series.
    let atr_series = match (&config.stop_loss, &config.sizing) {
        (Some(StopRule::Atr { .. }), _) | (_, SizingRule::AtrRisk { .. }) => {
            Some(atr(bars, ATR_PERIOD))
        }
        _ => None,
    };
    let atr_values = atr_series.as_deref();

    let mut cash = config.initial_capital;
    let mut position: Option<OpenPosition> = None;
    let mut trades: Vec<Trade> = Vec::new();
    let mut equity_curve: Vec<EquityPoint> = Vec::with_capacity(bars.len());
    let mut drawdown = DrawdownTracker::new();

    let first_close = bars.first().map(|b| b.close).unwrap_or(0.0);

    for (t, bar) in bars.iter().enumerate() {
        // ─── 1. Exit evaluation ───
        if let Some(pos) = &position {
            if let Some(trigger) = evaluate_exit(pos, bars, t, config, &costs, atr_values) {
                if gate.is_none_or_allows_exit(bars, t) {
                    let pos = position.take().expect("position checked above");
                    cash += close_position(&pos, trigger.price, bar, t, trigger.reason, &costs,
                                           &mut trades);
                    mark_bar(bar, cash, 0.0, first_close, config.initial_capital,
                             &mut drawdown, &mut equity_curve);
                    continue;
                }
            }
        }

        // ─── 2. Trailing-stop ratchet ───
        if let Some(StopRule::Trailing { pct }) = config.stop_loss {
            if let Some(pos) = position.as_mut() {
                pos.ratchet_trailing_stop(bar.high, pct);
            }
        }

        // ─── 3. Signal processing ───
        if let Some(signal) = book.get(bar.date) {
            match signal.action {
                SignalAction::Buy if position.is_none() => {
                    if gate.is_none_or_allows_entry(bars, t) {
                        let fill_price = costs.buy_price(signal.price);
                        let ctx = SizingContext {
                            cash,
                            price: fill_price,
                            commission_rate: config.commission_rate,
                            bars,
                            bar_index: t,
                            trades: &trades,
                            percent_stop: config.percent_stop(),
                            atr: atr_values,
                        };
                        let shares = sizer.size(&ctx);
                        // 0 shares is a valid "no trade" outcome, not an error
                        if shares > 0.0 {
                            cash -= costs.entry_cost(shares, fill_price);
                            let mut pos = OpenPosition::new(bar.date, fill_price, t, shares);
                            if let Some(StopRule::Trailing { pct }) = config.stop_loss {
                                pos.trailing_stop = Some(bar.close * (1.0 - pct));
                            }
                            position = Some(pos);
                        }
                    }
                }
                SignalAction::Sell if position.is_some() => {
                    if gate.is_none_or_allows_exit(bars, t) {
                        let pos = position.take().expect("position checked above");
                        let fill_price = costs.sell_price(signal.price);
                        cash += close_position(&pos, fill_price, bar, t, ExitReason::Signal,
                                               &costs, &mut trades);
                    }
                }
                _ => {}
            }
        }

        // ─── 4. Mark-to-market ───
        let shares = position.as_ref().map(|p| p.shares).unwrap_or(0.0);
        mark_bar(bar, cash, shares, first_close, config.initial_capital,
                 &mut drawdown, &mut equity_curve);
    }

    // An open position at the last bar stays open: mark-to-market only,
    // no trade record.
    let final_equity = equity_curve
        .last()
        .map(|p| p.equity)
        .unwrap_or(config.initial_capital);
    let metrics = Metrics::compute(&equity_curve, &trades, config.initial_capital);

    BacktestReport {
        trades,
        equity_curve,
        metrics,
        signals: signals.iter().filter(|s| s.is_actionable()).cloned().collect(),
        final_equity,
    }
}

/// Close the full position at `fill_price`, append the trade, and return the
/// net cash credit.
fn close_position(
    position: &OpenPosition,
    fill_price: f64,
    bar: &Bar,
    index: usize,
    reason: ExitReason,
    costs: &CostModel,
    trades: &mut Vec<Trade>,
) -> f64 {
    let net_proceeds = costs.net_proceeds(position.shares, fill_price);
    let entry_cost = costs.entry_cost(position.shares, position.entry_price);
    let pnl = net_proceeds - entry_cost;

    trades.push(Trade {
        entry_date: position.entry_date,
        entry_price: position.entry_price,
        exit_date: bar.date,
        exit_price: fill_price,
        shares: position.shares,
        pnl,
        pnl_pct: if entry_cost > 0.0 { pnl / entry_cost } else { 0.0 },
        hold_days: index - position.entry_index,
        side: TradeSide::Long,
        exit_reason: reason,
    });

    net_proceeds
}

/// End-of-bar accounting shared by the exit and fall-through paths.
fn mark_bar(
    bar: &Bar,
    cash: f64,
    shares: f64,
    first_close: f64,
    initial_capital: f64,
    drawdown: &mut DrawdownTracker,
    equity_curve: &mut Vec<EquityPoint>,
) {
    let equity = cash + shares * bar.close;
    let benchmark = if first_close > 0.0 {
        initial_capital * (bar.close / first_close)
    } else {
        initial_capital
    };
    let dd = drawdown.observe(equity);
    equity_curve.push(EquityPoint {
        date: bar.date,
        equity,
        drawdown: dd,
        benchmark,
    });
}

/// Running equity peak for the per-bar drawdown column. Depth and duration
/// summaries are derived from the finished curve by the metrics layer.
#[derive(Debug, Clone)]
struct DrawdownTracker {
    peak: f64,
}

impl DrawdownTracker {
    fn new() -> Self {
        Self { peak: f64::MIN }
    }

    /// Record this bar's equity; returns the current drawdown (<= 0).
    fn observe(&mut self, equity: f64) -> f64 {
        if equity > self.peak {
            self.peak = equity;
        }
        if self.peak <= 0.0 {
            return 0.0;
        }
        (equity - self.peak) / self.peak
    }
}

/// `Option<&dyn TradeGate>` helpers so the loop body stays readable.
trait GateExt {
    fn is_none_or_allows_entry(&self, bars: &[Bar], index: usize) -> bool;
    fn is_none_or_allows_exit(&self, bars: &[Bar], index: usize) -> bool;
}

impl GateExt for Option<&dyn TradeGate> {
    fn is_none_or_allows_entry(&self, bars: &[Bar], index: usize) -> bool {
        self.map_or(true, |g| g.allow_entry(bars, index))
    }

    fn is_none_or_allows_exit(&self, bars: &[Bar], index: usize) -> bool {
        self.map_or(true, |g| g.allow_exit(bars, index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TakeProfitRule;
    use chrono::NaiveDate;

    fn date(i: usize) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 2).unwrap() + chrono::Duration::days(i as i64)
    }

    /// Bars with the given closes; high/low bracket the close by 1%.
    fn bars_from_closes(closes: &[f64]) -> Vec<Bar> {
        closes
            .iter()
            .enumerate()
            .map(|(i, &close)| Bar {
                date: date(i),
                open: close,
                high: close * 1.01,
                low: close * 0.99,
                close,
                volume: 10_000,
            })
            .collect()
    }

    fn buy(i: usize, price: f64) -> Signal {
        Signal {
            date: date(i),
            action: SignalAction::Buy,
            price,
            reason: None,
        }
    }

    fn sell(i: usize, price: f64) -> Signal {
        Signal {
            date: date(i),
            action: SignalAction::Sell,
            price,
            reason: None,
        }
    }

    #[test]
    fn all_holds_leaves_capital_untouched() {
        let closes: Vec<f64> = (0..50).map(|i| 10.0 + (i as f64 * 0.37).sin()).collect();
        let bars = bars_from_closes(&closes);
        let signals: Vec<Signal> = bars
            .iter()
            .map(|b| Signal {
                date: b.date,
                action: SignalAction::Hold,
                price: b.close,
                reason: None,
            })
            .collect();
        let config = BacktestConfig::default();

        let report = run_backtest(&bars, &signals, &config);
        assert!(report.trades.is_empty());
        assert_eq!(report.equity_curve.len(), 50);
        assert_eq!(report.equity_curve.last().unwrap().equity, 100_000.0);
        assert_eq!(report.metrics.total_return, 0.0);
    }

    #[test]
    fn single_round_trip_ledger() {
        let mut closes = vec![10.0; 20];
        for (i, c) in closes.iter_mut().enumerate().skip(10) {
            *c = 10.0 + (i as f64 - 9.0) * 0.1;
        }
        let bars = bars_from_closes(&closes);
        let signals = vec![buy(5, 10.0), sell(15, 11.0)];
        let config = BacktestConfig::default();

        let report = run_backtest(&bars, &signals, &config);
        assert_eq!(report.trades.len(), 1);
        let trade = &report.trades[0];
        assert!((trade.entry_price - 10.01).abs() < 1e-9);
        assert_eq!(trade.hold_days, 10);
        assert!(trade.pnl > 0.0);
        assert_eq!(trade.exit_reason, ExitReason::Signal);

        // Cash conservation: final equity equals initial + net pnl
        let final_equity = report.equity_curve.last().unwrap().equity;
        assert!((final_equity - (100_000.0 + trade.pnl)).abs() < 1e-6);
    }

    #[test]
    fn capped_entry_never_overdraws_cash() {
        // Capital chosen so the cash cap binds: the entry debit (fill plus
        // buy-leg commission) must still fit in cash, never borrow.
        let bars = bars_from_closes(&[100.0; 10]);
        let signals = vec![buy(1, 100.0)];
        let config = BacktestConfig {
            initial_capital: 9_911.0,
            stop_loss: Some(StopRule::Percent { pct: 0.001 }),
            sizing: SizingRule::FixedFraction { risk_pct: 0.9 },
            ..Default::default()
        };

        let report = run_backtest(&bars, &signals, &config);
        assert_eq!(report.trades.len(), 1);
        let shares = report.trades[0].shares;
        let implied_cash = report.equity_curve[1].equity - shares * 100.0;
        assert!(implied_cash >= 0.0, "cash went negative: {implied_cash}");
    }

    #[test]
    fn second_buy_while_long_is_a_no_op() {
        let bars = bars_from_closes(&[10.0; 20]);
        let signals = vec![buy(3, 10.0), buy(6, 10.0), sell(12, 10.0)];
        let report = run_backtest(&bars, &signals, &BacktestConfig::default());
        assert_eq!(report.trades.len(), 1);
        assert_eq!(report.trades[0].entry_date, date(3));
    }

    #[test]
    fn sell_while_flat_is_a_no_op() {
        let bars = bars_from_closes(&[10.0; 10]);
        let signals = vec![sell(4, 10.0)];
        let report = run_backtest(&bars, &signals, &BacktestConfig::default());
        assert!(report.trades.is_empty());
        assert_eq!(report.equity_curve.last().unwrap().equity, 100_000.0);
    }

    #[test]
    fn open_position_at_final_bar_is_not_closed() {
        let bars = bars_from_closes(&[10.0, 10.0, 10.0, 10.5, 11.0]);
        let signals = vec![buy(1, 10.0)];
        let report = run_backtest(&bars, &signals, &BacktestConfig::default());
        assert!(report.trades.is_empty());
        // Mark-to-market at 11.0 shows the unrealized gain
        assert!(report.equity_curve.last().unwrap().equity > 100_000.0);
    }

    #[test]
    fn stop_loss_exit_skips_same_bar_buy() {
        // Entry at bar 1, crash at bar 3 breaching the 5% stop while a
        // fresh buy signal lands on the same bar: the buy must be dropped.
        let bars = bars_from_closes(&[10.0, 10.0, 10.0, 9.0, 9.0, 9.0]);
        let signals = vec![buy(1, 10.0), buy(3, 9.0)];
        let config = BacktestConfig {
            stop_loss: Some(StopRule::Percent { pct: 0.05 }),
            ..Default::default()
        };

        let report = run_backtest(&bars, &signals, &config);
        assert_eq!(report.trades.len(), 1);
        assert_eq!(report.trades[0].exit_reason, ExitReason::StopLoss);
        // No re-entry on bar 3 or later
        assert_eq!(report.equity_curve.last().unwrap().equity,
                   report.equity_curve[3].equity);
    }

    #[test]
    fn take_profit_exit_fires() {
        let bars = bars_from_closes(&[10.0, 10.0, 10.5, 11.5, 11.5]);
        let signals = vec![buy(1, 10.0)];
        let config = BacktestConfig {
            take_profit: Some(TakeProfitRule::Percent { pct: 0.10 }),
            ..Default::default()
        };

        let report = run_backtest(&bars, &signals, &config);
        assert_eq!(report.trades.len(), 1);
        assert_eq!(report.trades[0].exit_reason, ExitReason::TakeProfit);
        assert!(report.trades[0].pnl > 0.0);
    }

    #[test]
    fn max_hold_exit_fires() {
        let bars = bars_from_closes(&[10.0; 12]);
        let signals = vec![buy(1, 10.0)];
        let config = BacktestConfig {
            max_hold_bars: Some(5),
            ..Default::default()
        };

        let report = run_backtest(&bars, &signals, &config);
        assert_eq!(report.trades.len(), 1);
        assert_eq!(report.trades[0].exit_reason, ExitReason::MaxHold);
        assert_eq!(report.trades[0].hold_days, 5);
    }

    #[test]
    fn trailing_stop_ratchets_and_fires() {
        // Rise to 12, then fall; 10% trail from the 12.12 high arms ~10.9
        let bars = bars_from_closes(&[10.0, 10.0, 11.0, 12.0, 11.5, 10.5, 10.5]);
        let signals = vec![buy(1, 10.0)];
        let config = BacktestConfig {
            stop_loss: Some(StopRule::Trailing { pct: 0.10 }),
            ..Default::default()
        };

        let report = run_backtest(&bars, &signals, &config);
        assert_eq!(report.trades.len(), 1);
        assert_eq!(report.trades[0].exit_reason, ExitReason::StopLoss);
        // Exited above entry thanks to the ratchet
        assert!(report.trades[0].exit_price > 10.01);
    }

    #[test]
    fn equity_conservation_holds_every_bar() {
        let closes: Vec<f64> = (0..60).map(|i| 10.0 + (i as f64 * 0.23).sin()).collect();
        let bars = bars_from_closes(&closes);
        let signals = vec![buy(5, closes[5]), sell(20, closes[20]), buy(30, closes[30]),
                           sell(45, closes[45])];
        let config = BacktestConfig::default();

        let report = run_backtest(&bars, &signals, &config);
        for point in &report.equity_curve {
            assert!(point.equity > 0.0);
            assert!(point.drawdown <= 0.0);
        }
        assert_eq!(report.trades.len(), 2);
    }

    #[test]
    fn reruns_are_bit_identical() {
        let closes: Vec<f64> = (0..40).map(|i| 10.0 + (i as f64 * 0.41).cos()).collect();
        let bars = bars_from_closes(&closes);
        let signals = vec![buy(3, closes[3]), sell(17, closes[17])];
        let config = BacktestConfig {
            stop_loss: Some(StopRule::Percent { pct: 0.08 }),
            ..Default::default()
        };

        let a = run_backtest(&bars, &signals, &config);
        let b = run_backtest(&bars, &signals, &config);
        assert_eq!(a.metrics, b.metrics);
        assert_eq!(a.equity_curve, b.equity_curve);
        assert_eq!(a.trades.len(), b.trades.len());
        for (x, y) in a.trades.iter().zip(&b.trades) {
            assert_eq!(x.pnl.to_bits(), y.pnl.to_bits());
        }
    }

    #[test]
    fn benchmark_tracks_buy_and_hold() {
        let bars = bars_from_closes(&[10.0, 11.0, 12.0]);
        let report = run_backtest(&bars, &[], &BacktestConfig::default());
        let last = report.equity_curve.last().unwrap();
        assert!((last.benchmark - 120_000.0).abs() < 1e-9);
    }

    #[test]
    fn gate_vetoes_entry() {
        struct NoEntries;
        impl TradeGate for NoEntries {
            fn allow_entry(&self, _bars: &[Bar], _index: usize) -> bool {
                false
            }
        }

        let bars = bars_from_closes(&[10.0; 10]);
        let signals = vec![buy(2, 10.0)];
        let report = run_backtest_with_gate(&bars, &signals, &BacktestConfig::default(),
                                            Some(&NoEntries));
        assert!(report.trades.is_empty());
        assert_eq!(report.equity_curve.last().unwrap().equity, 100_000.0);
    }

    #[test]
    fn report_echoes_actionable_signals() {
        let bars = bars_from_closes(&[10.0; 10]);
        let signals = vec![
            Signal { date: date(0), action: SignalAction::Hold, price: 10.0, reason: None },
            buy(2, 10.0),
            sell(5, 10.0),
        ];
        let report = run_backtest(&bars, &signals, &BacktestConfig::default());
        assert_eq!(report.signals.len(), 2);
    }

    #[test]
    fn empty_bars_yield_empty_report() {
        let report = run_backtest(&[], &[], &BacktestConfig::default());
        assert!(report.trades.is_empty());
        assert!(report.equity_curve.is_empty());
        assert_eq!(report.final_equity, 100_000.0);
        assert_eq!(report.metrics.total_trades, 0);
    }
}
