//! Action requests and the audit trail they leave behind.

use crate::models::signal::Side;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Who asked for the action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FireOrigin {
    Auto,
    Manual,
}

/// A single approved-or-candidate action. Built fresh per evaluation and
/// consumed once by the dispatcher.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionRequest {
    pub side: Side,
    pub leverage_tier: f64,
    pub capital_fraction: f64,
    pub entry_trigger: f64,
    pub take_profit: f64,
    pub stop_loss: f64,
    pub confidence: u8,
    pub reference_price: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub liquidation_price: Option<f64>,
    /// The stop loss sits past the estimated liquidation price.
    #[serde(default)]
    pub stop_beyond_liquidation: bool,
    /// Notional size of the position.
    pub position_size: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_yield: Option<YieldEstimate>,
    pub origin: FireOrigin,
    pub created_at: DateTime<Utc>,
}

/// Rough fee income for holding the position inside its range.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct YieldEstimate {
    /// Reference range width over the actual width; tighter ranges score higher.
    pub range_efficiency: f64,
    pub daily: f64,
    pub weekly: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum NotificationOutcome {
    Delivered,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ExecutionOutcome {
    /// Automated execution is switched off; alert only.
    Disabled,
    Submitted { order_id: String },
    Failed { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityOutcome {
    pub notification: NotificationOutcome,
    pub execution: ExecutionOutcome,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityLogEntry {
    pub timestamp: DateTime<Utc>,
    pub side: Side,
    pub leverage: f64,
    pub origin: FireOrigin,
    pub outcome: ActivityOutcome,
}
