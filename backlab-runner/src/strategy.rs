//! Demo strategy: moving-average crossover.
//!
//! Emits one signal per bar. A fast SMA crossing above the slow SMA is a
//! buy, crossing below is a sell, everything else is a hold. The engine
//! discards holds, so the output can be fed straight into `run_backtest`.

use serde::{Deserialize, Serialize};

use backlab_core::registry::StrategyPlugin;
use backlab_core::{Bar, Signal, SignalAction};

/// Typed parameters with documented defaults (fast 10, slow 30).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaCrossParams {
    pub fast_period: usize,
    pub slow_period: usize,
}

impl Default for MaCrossParams {
    fn default() -> Self {
        Self {
            fast_period: 10,
            slow_period: 30,
        }
    }
}

pub struct MaCross {
    params: MaCrossParams,
}

impl MaCross {
    pub fn new(params: MaCrossParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> MaCrossParams {
        self.params
    }
}

impl StrategyPlugin for MaCross {
    fn id(&self) -> &str {
        "ma_cross"
    }

    fn generate_signals(&self, bars: &[Bar]) -> Vec<Signal> {
        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        let fast = sma(&closes, self.params.fast_period);
        let slow = sma(&closes, self.params.slow_period);

        bars.iter()
            .enumerate()
            .map(|(i, bar)| {
                let action = if i == 0 {
                    SignalAction::Hold
                } else {
                    match (fast[i - 1], slow[i - 1], fast[i], slow[i]) {
                        (pf, ps, cf, cs) if warm(pf, ps, cf, cs) && pf <= ps && cf > cs => {
                            SignalAction::Buy
                        }
                        (pf, ps, cf, cs) if warm(pf, ps, cf, cs) && pf >= ps && cf < cs => {
                            SignalAction::Sell
                        }
                        _ => SignalAction::Hold,
                    }
                };
                Signal {
                    date: bar.date,
                    action,
                    price: bar.close,
                    reason: match action {
                        SignalAction::Buy => Some("fast MA crossed above slow MA".into()),
                        SignalAction::Sell => Some("fast MA crossed below slow MA".into()),
                        SignalAction::Hold => None,
                    },
                }
            })
            .collect()
    }
}

fn warm(a: f64, b: f64, c: f64, d: f64) -> bool {
    a.is_finite() && b.is_finite() && c.is_finite() && d.is_finite()
}

/// Simple moving average, NaN for the warm-up prefix.
fn sma(values: &[f64], period: usize) -> Vec<f64> {
    let mut out = vec![f64::NAN; values.len()];
    if period == 0 || values.len() < period {
        return out;
    }
    let mut sum: f64 = values[..period].iter().sum();
    out[period - 1] = sum / period as f64;
    for i in period..values.len() {
        sum += values[i] - values[i - period];
        out[i] = sum / period as f64;
    }
    out
}
