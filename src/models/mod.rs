//! Shared data models spanning the engine layers.

pub mod action;
pub mod indicators;
pub mod signal;

pub use action::{
    ActionRequest, ActivityLogEntry, ActivityOutcome, ExecutionOutcome, FireOrigin,
    NotificationOutcome,
};
pub use indicators::{AtrIndicator, Candle, EmaIndicator, SmaIndicator};
pub use signal::{Bias, Direction, Side, Timeframe, TimeframeSignal};
