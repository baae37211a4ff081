//! Cooldown and price-condition gate in front of every action.

use crate::core::clock::Clock;
use crate::models::action::ActionRequest;
use crate::models::signal::{Bias, Side};
use crate::signals::aggregation::ConsensusResult;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info};

pub const DEFAULT_COOLDOWN_SECONDS: i64 = 300;
/// Longest accepted cooldown (30 days).
pub const MAX_COOLDOWN_SECONDS: i64 = 30 * 24 * 60 * 60;

/// Last approved fire per side.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TriggerState {
    pub last_long: Option<DateTime<Utc>>,
    pub last_short: Option<DateTime<Utc>>,
}

impl TriggerState {
    fn last(&self, side: Side) -> Option<DateTime<Utc>> {
        match side {
            Side::Long => self.last_long,
            Side::Short => self.last_short,
        }
    }

    fn record(&mut self, side: Side, at: DateTime<Utc>) {
        match side {
            Side::Long => self.last_long = Some(at),
            Side::Short => self.last_short = Some(at),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum GateState {
    Armed,
    Cooling {
        until: DateTime<Utc>,
        remaining_secs: i64,
    },
}

#[derive(Debug, Clone, PartialEq, Error, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum Rejection {
    #[error("consensus is neutral")]
    NeutralBias,
    #[error("confidence {confidence} below threshold {threshold}")]
    BelowThreshold { confidence: u8, threshold: u8 },
    #[error("price {price} has not crossed entry trigger {entry_trigger}")]
    PriceConditionUnmet { price: f64, entry_trigger: f64 },
    #[error("cooling down for another {remaining_secs}s")]
    CoolingDown { remaining_secs: i64 },
}

impl Rejection {
    /// Stable label for metrics.
    pub fn label(&self) -> &'static str {
        match self {
            Rejection::NeutralBias => "neutral_bias",
            Rejection::BelowThreshold { .. } => "below_threshold",
            Rejection::PriceConditionUnmet { .. } => "price_condition",
            Rejection::CoolingDown { .. } => "cooldown",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum GateDecision {
    Fired { at: DateTime<Utc> },
    Rejected(Rejection),
}

impl GateDecision {
    pub fn is_fired(&self) -> bool {
        matches!(self, GateDecision::Fired { .. })
    }
}

pub struct TriggerGate {
    threshold: u8,
    cooldown: Duration,
    clock: Arc<dyn Clock>,
    state: Mutex<TriggerState>,
}

impl TriggerGate {
    pub fn new(threshold: u8, cooldown_seconds: i64, clock: Arc<dyn Clock>) -> Self {
        Self {
            threshold,
            cooldown: Duration::seconds(cooldown_seconds.clamp(0, MAX_COOLDOWN_SECONDS)),
            clock,
            state: Mutex::new(TriggerState::default()),
        }
    }

    pub fn threshold(&self) -> u8 {
        self.threshold
    }

    /// Decide whether `request` may fire at `current_price`.
    ///
    /// All checks and the timestamp update happen under one lock, so two
    /// concurrent callers for the same side can never both fire inside the
    /// cooldown. A rejected attempt leaves the state untouched.
    pub async fn try_fire(
        &self,
        consensus: &ConsensusResult,
        request: &ActionRequest,
        current_price: f64,
    ) -> GateDecision {
        let mut state = self.state.lock().await;
        let now = self.clock.now();

        if let Some(rejection) = self.precheck(consensus, request, current_price) {
            debug!(
                side = %request.side,
                reason = rejection.label(),
                "TriggerGate: rejected {} ({})",
                request.side,
                rejection
            );
            return GateDecision::Rejected(rejection);
        }

        if let Some(remaining) = self.remaining(&state, request.side, now) {
            let rejection = Rejection::CoolingDown {
                remaining_secs: remaining.num_seconds(),
            };
            debug!(
                side = %request.side,
                remaining_secs = remaining.num_seconds(),
                "TriggerGate: {} still cooling for {}s",
                request.side,
                remaining.num_seconds()
            );
            return GateDecision::Rejected(rejection);
        }

        state.record(request.side, now);
        info!(
            side = %request.side,
            confidence = consensus.confidence,
            price = current_price,
            entry_trigger = request.entry_trigger,
            "TriggerGate: fired {} at confidence {}",
            request.side,
            consensus.confidence
        );
        GateDecision::Fired { at: now }
    }

    pub async fn state(&self, side: Side) -> GateState {
        let state = self.state.lock().await;
        let now = self.clock.now();
        match self.remaining(&state, side, now) {
            Some(remaining) => GateState::Cooling {
                until: now + remaining,
                remaining_secs: remaining.num_seconds(),
            },
            None => GateState::Armed,
        }
    }

    pub async fn trigger_state(&self) -> TriggerState {
        self.state.lock().await.clone()
    }

    fn precheck(
        &self,
        consensus: &ConsensusResult,
        request: &ActionRequest,
        current_price: f64,
    ) -> Option<Rejection> {
        if consensus.bias == Bias::Neutral {
            return Some(Rejection::NeutralBias);
        }
        if consensus.confidence < self.threshold {
            return Some(Rejection::BelowThreshold {
                confidence: consensus.confidence,
                threshold: self.threshold,
            });
        }
        if !request
            .side
            .price_condition_met(current_price, request.entry_trigger)
        {
            return Some(Rejection::PriceConditionUnmet {
                price: current_price,
                entry_trigger: request.entry_trigger,
            });
        }
        None
    }

    fn remaining(&self, state: &TriggerState, side: Side, now: DateTime<Utc>) -> Option<Duration> {
        let last = state.last(side)?;
        let elapsed = now - last;
        (elapsed < self.cooldown).then(|| self.cooldown - elapsed)
    }
}
