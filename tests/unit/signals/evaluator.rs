//! Unit tests for the timeframe evaluator

use chrono::{Duration, TimeZone, Utc};
use std::sync::Arc;
use tokio_test::assert_err;
use trendgate::core::clock::ManualClock;
use trendgate::error::EngineError;
use trendgate::models::indicators::Candle;
use trendgate::models::signal::{Direction, Timeframe};
use trendgate::services::market_data::InMemoryMarketDataProvider;
use trendgate::signals::evaluator::{classify, TimeframeEvaluator};

fn series(closes: &[f64]) -> Vec<Candle> {
    let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &c)| Candle::new(c, c + 1.0, c - 1.0, c, 10.0, start + Duration::hours(i as i64)))
        .collect()
}

#[test]
fn test_price_above_both_averages_is_long() {
    assert_eq!(classify(100.0, 95.0, 90.0), Direction::Long);
}

#[test]
fn test_price_below_both_averages_is_short() {
    assert_eq!(classify(80.0, 95.0, 90.0), Direction::Short);
}

#[test]
fn test_price_between_averages_is_neutral() {
    assert_eq!(classify(92.0, 95.0, 90.0), Direction::Neutral);
    // touching an average is not a break
    assert_eq!(classify(95.0, 95.0, 90.0), Direction::Neutral);
}

#[test]
fn test_short_history_is_unavailable() {
    let evaluator = TimeframeEvaluator::default();
    let closes: Vec<f64> = (0..150).map(|i| 100.0 + i as f64).collect();
    let signal = evaluator.evaluate(Timeframe::H1, &series(&closes), Utc::now());

    assert_eq!(signal.direction, Direction::Unavailable);
    assert_eq!(signal.bars, 150);
    assert_eq!(signal.price, Some(249.0));
    assert!(signal.slow_average.is_none());
    // fast average and ATR still computable
    assert!(signal.fast_average.is_some());
    assert!(signal.atr.is_some());
}

#[test]
fn test_rising_series_is_long_with_readings() {
    let evaluator = TimeframeEvaluator::new(3, 5, 3).unwrap();
    let signal = evaluator.evaluate(
        Timeframe::D1,
        &series(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]),
        Utc::now(),
    );

    assert_eq!(signal.direction, Direction::Long);
    assert_eq!(signal.price, Some(6.0));
    assert_eq!(signal.slow_average, Some(4.0));
    assert!((signal.atr.unwrap() - 2.0).abs() < 1e-9);
    assert!(signal.fast_average.unwrap() < 6.0);
}

#[test]
fn test_falling_series_is_short() {
    let evaluator = TimeframeEvaluator::new(3, 5, 3).unwrap();
    let signal = evaluator.evaluate(
        Timeframe::M5,
        &series(&[10.0, 9.0, 8.0, 7.0, 6.0, 5.0]),
        Utc::now(),
    );
    assert_eq!(signal.direction, Direction::Short);
}

#[test]
fn test_empty_series_is_unavailable_without_price() {
    let evaluator = TimeframeEvaluator::default();
    let signal = evaluator.evaluate(Timeframe::M1, &[], Utc::now());
    assert_eq!(signal.direction, Direction::Unavailable);
    assert!(signal.price.is_none());
}

#[test]
fn test_invalid_periods_rejected() {
    assert!(TimeframeEvaluator::new(0, 5, 3).is_err());
    assert!(TimeframeEvaluator::new(5, 5, 3).is_err());
    assert!(TimeframeEvaluator::new(3, 5, 0).is_err());
    // would wrap to a tiny period if truncated
    assert!(TimeframeEvaluator::new(3, u32::MAX as usize + 6, 3).is_err());
}

#[tokio::test]
async fn test_judge_stamps_signal_with_clock() {
    let at = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
    let clock = ManualClock::new(at);
    let provider = InMemoryMarketDataProvider::new();
    provider
        .set_series(Timeframe::H4, series(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]))
        .await;

    let evaluator = TimeframeEvaluator::new(3, 5, 3).unwrap();
    let signal = evaluator
        .judge(&provider, Timeframe::H4, &clock)
        .await
        .unwrap();
    assert_eq!(signal.timeframe, Timeframe::H4);
    assert_eq!(signal.last_updated, at);
    assert_eq!(signal.direction, Direction::Long);
}

#[tokio::test]
async fn test_judge_propagates_fetch_failure() {
    let clock = Arc::new(ManualClock::new(Utc::now()));
    let provider = InMemoryMarketDataProvider::new();
    provider.set_failure(Timeframe::M15, "connection reset").await;

    let evaluator = TimeframeEvaluator::default();
    let err = assert_err!(evaluator.judge(&provider, Timeframe::M15, clock.as_ref()).await);
    assert!(matches!(
        err,
        EngineError::DataUnavailable { timeframe: Timeframe::M15, .. }
    ));
}
