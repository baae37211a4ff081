//! Unit tests for the trigger gate

use chrono::{Duration, TimeZone, Utc};
use std::sync::Arc;
use trendgate::core::clock::{Clock, ManualClock};
use trendgate::execution::gate::{
    GateDecision, GateState, Rejection, TriggerGate, MAX_COOLDOWN_SECONDS,
};
use trendgate::models::action::{ActionRequest, FireOrigin};
use trendgate::models::signal::{Bias, Side};
use trendgate::signals::aggregation::ConsensusResult;

fn consensus(bias: Bias, confidence: u8) -> ConsensusResult {
    ConsensusResult {
        long_votes: confidence,
        short_votes: 0,
        available: 8,
        confidence,
        bias,
        leverage_tier: 3.0,
        cycle: 1,
    }
}

fn request(side: Side, entry_trigger: f64) -> ActionRequest {
    ActionRequest {
        side,
        leverage_tier: 3.0,
        capital_fraction: 0.05,
        entry_trigger,
        take_profit: 110.0,
        stop_loss: 90.0,
        confidence: 5,
        reference_price: 100.0,
        liquidation_price: Some(85.0),
        stop_beyond_liquidation: false,
        position_size: 1000.0,
        estimated_yield: None,
        origin: FireOrigin::Auto,
        created_at: Utc::now(),
    }
}

fn setup() -> (Arc<ManualClock>, TriggerGate) {
    let clock = Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
    ));
    let gate = TriggerGate::new(4, 300, clock.clone());
    (clock, gate)
}

#[tokio::test]
async fn test_fires_once_within_cooldown() {
    let (clock, gate) = setup();
    let c = consensus(Bias::Long, 5);
    let r = request(Side::Long, 100.0);

    assert!(gate.try_fire(&c, &r, 101.0).await.is_fired());

    clock.advance(Duration::seconds(299));
    assert_eq!(
        gate.try_fire(&c, &r, 101.0).await,
        GateDecision::Rejected(Rejection::CoolingDown { remaining_secs: 1 })
    );

    clock.advance(Duration::seconds(1));
    assert!(gate.try_fire(&c, &r, 101.0).await.is_fired());
}

#[tokio::test]
async fn test_price_below_long_entry_does_not_fire() {
    let (_clock, gate) = setup();
    let decision = gate
        .try_fire(&consensus(Bias::Long, 5), &request(Side::Long, 100.0), 99.0)
        .await;
    assert_eq!(
        decision,
        GateDecision::Rejected(Rejection::PriceConditionUnmet {
            price: 99.0,
            entry_trigger: 100.0
        })
    );
    // a rejection does not start the cooldown
    assert_eq!(gate.state(Side::Long).await, GateState::Armed);
}

#[tokio::test]
async fn test_short_requires_price_at_or_below_entry() {
    let (_clock, gate) = setup();
    let c = consensus(Bias::Short, 6);
    assert!(!gate
        .try_fire(&c, &request(Side::Short, 100.0), 100.5)
        .await
        .is_fired());
    assert!(gate
        .try_fire(&c, &request(Side::Short, 100.0), 100.0)
        .await
        .is_fired());
}

#[tokio::test]
async fn test_sides_cool_independently() {
    let (_clock, gate) = setup();
    assert!(gate
        .try_fire(&consensus(Bias::Long, 5), &request(Side::Long, 100.0), 101.0)
        .await
        .is_fired());
    assert!(gate
        .try_fire(&consensus(Bias::Short, 5), &request(Side::Short, 100.0), 99.0)
        .await
        .is_fired());

    let state = gate.trigger_state().await;
    assert!(state.last_long.is_some());
    assert!(state.last_short.is_some());
}

#[tokio::test]
async fn test_neutral_and_low_confidence_rejected() {
    let (_clock, gate) = setup();
    let r = request(Side::Long, 100.0);
    assert_eq!(
        gate.try_fire(&consensus(Bias::Neutral, 3), &r, 101.0).await,
        GateDecision::Rejected(Rejection::NeutralBias)
    );
    assert_eq!(
        gate.try_fire(&consensus(Bias::Long, 3), &r, 101.0).await,
        GateDecision::Rejected(Rejection::BelowThreshold {
            confidence: 3,
            threshold: 4
        })
    );
}

#[tokio::test]
async fn test_state_reports_cooling_until() {
    let (clock, gate) = setup();
    let fired_at = clock.now();
    assert!(gate
        .try_fire(&consensus(Bias::Long, 5), &request(Side::Long, 100.0), 101.0)
        .await
        .is_fired());

    clock.advance(Duration::seconds(100));
    assert_eq!(
        gate.state(Side::Long).await,
        GateState::Cooling {
            until: fired_at + Duration::seconds(300),
            remaining_secs: 200
        }
    );
    assert_eq!(gate.state(Side::Short).await, GateState::Armed);
}

#[tokio::test]
async fn test_concurrent_attempts_fire_once() {
    let (_clock, gate) = setup();
    let gate = Arc::new(gate);
    let c = consensus(Bias::Long, 5);
    let r = request(Side::Long, 100.0);

    let (a, b) = tokio::join!(gate.try_fire(&c, &r, 101.0), gate.try_fire(&c, &r, 101.0));
    assert_eq!([a.is_fired(), b.is_fired()].iter().filter(|f| **f).count(), 1);
}

#[tokio::test]
async fn test_oversized_cooldown_is_clamped() {
    let clock = Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
    ));
    let gate = TriggerGate::new(4, i64::MAX, clock.clone());
    let c = consensus(Bias::Long, 5);
    let r = request(Side::Long, 100.0);

    let fired_at = clock.now();
    assert!(gate.try_fire(&c, &r, 101.0).await.is_fired());
    assert_eq!(
        gate.state(Side::Long).await,
        GateState::Cooling {
            until: fired_at + Duration::seconds(MAX_COOLDOWN_SECONDS),
            remaining_secs: MAX_COOLDOWN_SECONDS
        }
    );
}
