//! Market data provider interface and an in-memory implementation.

use crate::error::EngineError;
use crate::models::indicators::Candle;
use crate::models::signal::Timeframe;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::RwLock;

#[async_trait::async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Ascending OHLC bars for one timeframe.
    ///
    /// A series too short to evaluate may be reported as
    /// [`EngineError::InsufficientHistory`]; it must not be silently truncated.
    async fn fetch(&self, timeframe: Timeframe) -> Result<Vec<Candle>, EngineError>;
}

#[derive(Debug, Clone)]
enum Scripted {
    Series(Vec<Candle>),
    Failure(String),
}

/// Provider serving series held in memory.
///
/// Each timeframe can be loaded with a series, a failure, or an artificial
/// delay; unknown timeframes fail as unavailable. Useful for replaying
/// captured data and for exercising the engine without a network.
#[derive(Debug, Default)]
pub struct InMemoryMarketDataProvider {
    series: RwLock<HashMap<Timeframe, Scripted>>,
    delays: RwLock<HashMap<Timeframe, Duration>>,
}

impl InMemoryMarketDataProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set_series(&self, timeframe: Timeframe, candles: Vec<Candle>) {
        self.series
            .write()
            .await
            .insert(timeframe, Scripted::Series(candles));
    }

    pub async fn set_failure(&self, timeframe: Timeframe, reason: impl Into<String>) {
        self.series
            .write()
            .await
            .insert(timeframe, Scripted::Failure(reason.into()));
    }

    pub async fn set_delay(&self, timeframe: Timeframe, delay: Duration) {
        self.delays.write().await.insert(timeframe, delay);
    }

    pub async fn clear_delay(&self, timeframe: Timeframe) {
        self.delays.write().await.remove(&timeframe);
    }
}

#[async_trait::async_trait]
impl MarketDataProvider for InMemoryMarketDataProvider {
    async fn fetch(&self, timeframe: Timeframe) -> Result<Vec<Candle>, EngineError> {
        let delay = self.delays.read().await.get(&timeframe).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        match self.series.read().await.get(&timeframe) {
            Some(Scripted::Series(candles)) => Ok(candles.clone()),
            Some(Scripted::Failure(reason)) => {
                Err(EngineError::data_unavailable(timeframe, reason.clone()))
            }
            None => Err(EngineError::data_unavailable(timeframe, "no data loaded")),
        }
    }
}
