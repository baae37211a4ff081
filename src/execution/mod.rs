//! Gate and dispatch of trade actions

pub mod activity;
pub mod dispatcher;
pub mod gate;

pub use activity::ActivityLog;
pub use dispatcher::{compose_alert, ActionDispatcher, DispatcherConfig};
pub use gate::{GateDecision, GateState, Rejection, TriggerGate, TriggerState};
