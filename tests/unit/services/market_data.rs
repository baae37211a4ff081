//! Unit tests for market data providers

use chrono::{DateTime, Duration, Utc};
use std::time::Duration as StdDuration;
use tokio_test::{assert_err, assert_ok};
use trendgate::error::EngineError;
use trendgate::models::indicators::Candle;
use trendgate::models::signal::Timeframe;
use trendgate::services::kraken::provider::fold_into_twelve_hours;
use trendgate::services::kraken::KrakenMarketDataProvider;
use trendgate::services::market_data::{InMemoryMarketDataProvider, MarketDataProvider};

fn bar(ts: i64, open: f64, high: f64, low: f64, close: f64) -> Candle {
    Candle::new(
        open,
        high,
        low,
        close,
        1.0,
        DateTime::from_timestamp(ts, 0).unwrap(),
    )
}

// 2023-11-15 00:00:00 UTC, a 12h boundary
const BASE: i64 = 1_700_006_400;
const FOUR_HOURS: i64 = 4 * 3600;

#[tokio::test]
async fn test_in_memory_serves_loaded_series() {
    let provider = InMemoryMarketDataProvider::new();
    provider
        .set_series(Timeframe::M1, vec![Candle::flat(1.0, Utc::now())])
        .await;

    let candles = assert_ok!(provider.fetch(Timeframe::M1).await);
    assert_eq!(candles.len(), 1);

    let err = assert_err!(provider.fetch(Timeframe::M5).await);
    assert!(matches!(err, EngineError::DataUnavailable { .. }));
}

#[tokio::test]
async fn test_in_memory_scripted_failure() {
    let provider = InMemoryMarketDataProvider::new();
    provider
        .set_series(Timeframe::H1, vec![Candle::flat(1.0, Utc::now())])
        .await;
    provider.set_failure(Timeframe::H1, "rate limited").await;

    let err = assert_err!(provider.fetch(Timeframe::H1).await);
    assert_eq!(err.to_string(), "data unavailable for 1h: rate limited");
}

#[tokio::test(start_paused = true)]
async fn test_in_memory_delay() {
    let provider = InMemoryMarketDataProvider::new();
    provider
        .set_series(Timeframe::D1, vec![Candle::flat(1.0, Utc::now())])
        .await;
    provider
        .set_delay(Timeframe::D1, StdDuration::from_secs(30))
        .await;

    let slow = tokio::time::timeout(StdDuration::from_secs(5), provider.fetch(Timeframe::D1)).await;
    assert!(slow.is_err());

    provider.clear_delay(Timeframe::D1).await;
    assert_ok!(provider.fetch(Timeframe::D1).await);
}

#[test]
fn test_pair_code() {
    assert_eq!(KrakenMarketDataProvider::pair_code("SOL/USD"), "SOLUSD");
    assert_eq!(KrakenMarketDataProvider::pair_code("xbt-eur"), "XBTEUR");
}

#[test]
fn test_fold_four_hour_bars_into_twelve_hours() {
    let bars = vec![
        bar(BASE, 10.0, 12.0, 9.0, 11.0),
        bar(BASE + FOUR_HOURS, 11.0, 15.0, 10.0, 14.0),
        bar(BASE + 2 * FOUR_HOURS, 14.0, 14.5, 8.0, 9.0),
        bar(BASE + 3 * FOUR_HOURS, 9.0, 10.0, 8.5, 9.5),
    ];
    let folded = fold_into_twelve_hours(&bars);

    assert_eq!(folded.len(), 2);
    let first = &folded[0];
    assert_eq!(first.timestamp.timestamp(), BASE);
    assert_eq!(first.open, 10.0);
    assert_eq!(first.high, 15.0);
    assert_eq!(first.low, 8.0);
    assert_eq!(first.close, 9.0);
    assert_eq!(first.volume, 3.0);
    // live bar kept even though partial
    assert_eq!(folded[1].close, 9.5);
    assert_eq!(folded[1].timestamp.timestamp(), BASE + 3 * FOUR_HOURS);
}

#[test]
fn test_fold_drops_partial_leading_bucket() {
    let start = BASE + 2 * FOUR_HOURS;
    let bars: Vec<Candle> = (0..4)
        .map(|i| bar(start + i * FOUR_HOURS, 1.0, 2.0, 0.5, 1.5))
        .collect();
    let folded = fold_into_twelve_hours(&bars);

    assert_eq!(folded.len(), 1);
    assert_eq!(
        folded[0].timestamp,
        DateTime::from_timestamp(BASE, 0).unwrap() + Duration::hours(12)
    );
}
