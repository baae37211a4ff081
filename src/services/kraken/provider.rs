//! Kraken market data provider implementation

use crate::error::EngineError;
use crate::models::indicators::Candle;
use crate::models::signal::Timeframe;
use crate::services::market_data::MarketDataProvider;
use chrono::DateTime;
use tracing::debug;

use super::messages::{OhlcResponse, OhlcRow};

const TWELVE_HOURS_SECS: i64 = 12 * 60 * 60;

pub struct KrakenMarketDataProvider {
    client: reqwest::Client,
    base_url: String,
    pair: String,
    min_bars: usize,
}

impl KrakenMarketDataProvider {
    pub fn new(base_url: impl Into<String>, symbol: &str) -> Self {
        Self::with_client(base_url, symbol, reqwest::Client::new())
    }

    pub fn with_client(base_url: impl Into<String>, symbol: &str, client: reqwest::Client) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            pair: Self::pair_code(symbol),
            min_bars: 0,
        }
    }

    /// Report series shorter than `min_bars` as `InsufficientHistory`.
    pub fn with_min_bars(mut self, min_bars: usize) -> Self {
        self.min_bars = min_bars;
        self
    }

    /// `SOL/USD` → `SOLUSD`
    pub fn pair_code(symbol: &str) -> String {
        symbol
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_uppercase()
    }

    async fn fetch_interval(
        &self,
        timeframe: Timeframe,
        interval_minutes: u32,
    ) -> Result<Vec<Candle>, EngineError> {
        let url = format!("{}/0/public/OHLC", self.base_url);
        let interval = interval_minutes.to_string();
        let response = self
            .client
            .get(&url)
            .query(&[("pair", self.pair.as_str()), ("interval", interval.as_str())])
            .send()
            .await
            .map_err(|e| {
                EngineError::data_unavailable(timeframe, format!("request failed: {}", e))
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(EngineError::data_unavailable(
                timeframe,
                format!("HTTP {}", status),
            ));
        }

        let body: OhlcResponse = response.json().await.map_err(|e| {
            EngineError::data_unavailable(timeframe, format!("invalid response body: {}", e))
        })?;
        let rows = body
            .rows()
            .map_err(|reason| EngineError::data_unavailable(timeframe, reason))?;

        rows.iter()
            .map(|row| {
                parse_row(row).ok_or_else(|| {
                    EngineError::data_unavailable(
                        timeframe,
                        format!("unparseable bar at {}", row.0),
                    )
                })
            })
            .collect()
    }
}

fn parse_row(row: &OhlcRow) -> Option<Candle> {
    let timestamp = DateTime::from_timestamp(row.0, 0)?;
    Some(Candle::new(
        row.1.parse().ok()?,
        row.2.parse().ok()?,
        row.3.parse().ok()?,
        row.4.parse().ok()?,
        row.6.parse().ok()?,
        timestamp,
    ))
}

/// Fold 4h bars into 12h bars aligned on 00:00/12:00 UTC.
///
/// A leading bucket with fewer than three bars is dropped; the trailing one is
/// kept since it is the live bar.
pub fn fold_into_twelve_hours(candles: &[Candle]) -> Vec<Candle> {
    let mut folded: Vec<(i64, usize, Candle)> = Vec::new();
    for candle in candles {
        let bucket = candle.timestamp.timestamp().div_euclid(TWELVE_HOURS_SECS);
        match folded.last_mut() {
            Some((current, count, bar)) if *current == bucket => {
                bar.high = bar.high.max(candle.high);
                bar.low = bar.low.min(candle.low);
                bar.close = candle.close;
                bar.volume += candle.volume;
                *count += 1;
            }
            _ => {
                let start = DateTime::from_timestamp(bucket * TWELVE_HOURS_SECS, 0)
                    .unwrap_or(candle.timestamp);
                let mut bar = candle.clone();
                bar.timestamp = start;
                folded.push((bucket, 1, bar));
            }
        }
    }

    if folded.len() > 1 && folded[0].1 < 3 {
        folded.remove(0);
    }
    folded.into_iter().map(|(_, _, bar)| bar).collect()
}

#[async_trait::async_trait]
impl MarketDataProvider for KrakenMarketDataProvider {
    async fn fetch(&self, timeframe: Timeframe) -> Result<Vec<Candle>, EngineError> {
        let candles = match timeframe {
            // no native 12h interval
            Timeframe::H12 => {
                let four_hourly = self.fetch_interval(timeframe, Timeframe::H4.minutes()).await?;
                fold_into_twelve_hours(&four_hourly)
            }
            tf => self.fetch_interval(tf, tf.minutes()).await?,
        };

        debug!(
            timeframe = %timeframe,
            pair = %self.pair,
            count = candles.len(),
            "Kraken: fetched {} bars for {} {}",
            candles.len(),
            self.pair,
            timeframe
        );

        if candles.len() < self.min_bars {
            return Err(EngineError::InsufficientHistory {
                timeframe,
                bars: candles.len(),
                required: self.min_bars,
            });
        }
        Ok(candles)
    }
}
