//! Engine error taxonomy

use crate::models::signal::Timeframe;
use thiserror::Error;

/// Every failure the engine distinguishes.
///
/// Only [`EngineError::ConfigurationError`] is fatal, and only at startup.
/// The other variants are isolated to the timeframe or action that raised
/// them and never abort a poll cycle.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    /// A single timeframe could not be fetched this cycle; its previous vault
    /// entry is retained.
    #[error("data unavailable for {timeframe}: {reason}")]
    DataUnavailable { timeframe: Timeframe, reason: String },

    /// The series is shorter than the slow moving-average period.
    #[error("insufficient history for {timeframe}: {bars} bars, {required} required")]
    InsufficientHistory {
        timeframe: Timeframe,
        bars: usize,
        required: usize,
    },

    #[error("notification failed: {0}")]
    NotificationFailure(String),

    #[error("order execution failed: {0}")]
    ExecutionFailure(String),

    #[error("configuration error: {0}")]
    ConfigurationError(String),
}

impl EngineError {
    pub fn data_unavailable(timeframe: Timeframe, reason: impl Into<String>) -> Self {
        Self::DataUnavailable {
            timeframe,
            reason: reason.into(),
        }
    }

    pub fn config(reason: impl Into<String>) -> Self {
        Self::ConfigurationError(reason.into())
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::ConfigurationError(_))
    }
}
