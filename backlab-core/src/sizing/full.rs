//! Full-capital sizer — all cash into the position, commission-adjusted.

use super::{PositionSizer, SizingContext};

/// Spends the whole cash balance: `floor(cash / (price * (1 + commission)))`.
/// The commission adjustment keeps the all-in debit within available cash.
#[derive(Debug, Clone, Copy, Default)]
pub struct FullSizer;

impl PositionSizer for FullSizer {
    fn size(&self, ctx: &SizingContext) -> f64 {
        ctx.max_affordable()
    }

    fn name(&self) -> &str {
        "full"
    }
}
