//! Per-timeframe trend verdicts.

use crate::core::clock::Clock;
use crate::error::EngineError;
use crate::indicators::trend::{calculate_ema, calculate_sma};
use crate::indicators::volatility::calculate_atr;
use crate::models::indicators::Candle;
use crate::models::signal::{Direction, Timeframe, TimeframeSignal};
use crate::services::market_data::MarketDataProvider;
use chrono::{DateTime, Utc};
use tracing::debug;

pub const DEFAULT_FAST_PERIOD: u32 = 20;
pub const DEFAULT_SLOW_PERIOD: u32 = 200;
pub const DEFAULT_ATR_PERIOD: u32 = 14;

/// Classify the latest price against the fast and slow averages.
///
/// Long when above both, Short when below both, Neutral otherwise.
pub fn classify(price: f64, fast_average: f64, slow_average: f64) -> Direction {
    if price > slow_average && price > fast_average {
        Direction::Long
    } else if price < slow_average && price < fast_average {
        Direction::Short
    } else {
        Direction::Neutral
    }
}

fn period(name: &str, value: usize) -> Result<u32, EngineError> {
    u32::try_from(value)
        .map_err(|_| EngineError::config(format!("{} period {} is too large", name, value)))
}

/// Turns one timeframe's price history into a [`TimeframeSignal`].
#[derive(Debug, Clone)]
pub struct TimeframeEvaluator {
    fast_period: u32,
    slow_period: u32,
    atr_period: u32,
}

impl Default for TimeframeEvaluator {
    fn default() -> Self {
        Self {
            fast_period: DEFAULT_FAST_PERIOD,
            slow_period: DEFAULT_SLOW_PERIOD,
            atr_period: DEFAULT_ATR_PERIOD,
        }
    }
}

impl TimeframeEvaluator {
    pub fn new(
        fast_period: usize,
        slow_period: usize,
        atr_period: usize,
    ) -> Result<Self, EngineError> {
        if fast_period == 0 || fast_period >= slow_period {
            return Err(EngineError::config(format!(
                "moving-average periods must satisfy 0 < fast < slow, got {}/{}",
                fast_period, slow_period
            )));
        }
        if atr_period == 0 {
            return Err(EngineError::config("ATR period must be > 0"));
        }
        Ok(Self {
            fast_period: period("fast", fast_period)?,
            slow_period: period("slow", slow_period)?,
            atr_period: period("ATR", atr_period)?,
        })
    }

    pub fn slow_period(&self) -> usize {
        self.slow_period as usize
    }

    /// Evaluate an ascending series.
    ///
    /// A series shorter than the slow period yields `Unavailable` rather than
    /// a misleading `Neutral`; the latest price and ATR are still recorded
    /// when they can be computed.
    pub fn evaluate(
        &self,
        timeframe: Timeframe,
        candles: &[Candle],
        at: DateTime<Utc>,
    ) -> TimeframeSignal {
        let mut signal = TimeframeSignal::unavailable(timeframe, at).with_bars(candles.len());

        let Some(last) = candles.last() else {
            return signal;
        };
        signal = signal.with_price(last.close);

        if let Some(atr) = calculate_atr(candles, self.atr_period) {
            signal = signal.with_atr(atr.value);
        }
        if let Some(fast) = calculate_ema(candles, self.fast_period) {
            signal = signal.with_fast_average(fast.value);
        }

        let Some(slow) = calculate_sma(candles, self.slow_period) else {
            debug!(
                timeframe = %timeframe,
                bars = candles.len(),
                required = self.slow_period,
                "Evaluator: insufficient history for {} ({} < {})",
                timeframe,
                candles.len(),
                self.slow_period
            );
            return signal;
        };

        // slow period > fast period, so the fast average exists here too
        let fast = signal.fast_average.unwrap_or(last.close);
        signal.direction = classify(last.close, fast, slow.value);
        signal.slow_average = Some(slow.value);
        signal
    }

    /// Fetch and evaluate one timeframe.
    ///
    /// An `InsufficientHistory` report from the provider becomes an
    /// `Unavailable` verdict (a successful read that cannot vote); every other
    /// provider error is returned so the caller keeps the previous entry.
    pub async fn judge(
        &self,
        provider: &dyn MarketDataProvider,
        timeframe: Timeframe,
        clock: &dyn Clock,
    ) -> Result<TimeframeSignal, EngineError> {
        match provider.fetch(timeframe).await {
            Ok(candles) => Ok(self.evaluate(timeframe, &candles, clock.now())),
            Err(EngineError::InsufficientHistory { bars, .. }) => {
                Ok(TimeframeSignal::unavailable(timeframe, clock.now()).with_bars(bars))
            }
            Err(e) => Err(e),
        }
    }
}
