//! Domain types: bars, signals, trades, equity points, and the open position.

pub mod bar;
pub mod equity;
pub mod position;
pub mod signal;
pub mod trade;

pub use bar::Bar;
pub use equity::EquityPoint;
pub use position::OpenPosition;
pub use signal::{Signal, SignalAction, SignalBook};
pub use trade::{ExitReason, Trade, TradeSide};
