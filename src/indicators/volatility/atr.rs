//! ATR (Average True Range) indicator

use crate::common::math;
use crate::models::indicators::{AtrIndicator, Candle};

/// Calculate ATR as the simple mean of the last `period` bar ranges.
///
/// A bar's range is the spread between the highest and lowest of its high,
/// low and close; the previous close is not consulted.
pub fn calculate_atr(candles: &[Candle], period: u32) -> Option<AtrIndicator> {
    if period == 0 || candles.len() < period as usize {
        return None;
    }

    let ranges: Vec<f64> = candles.iter().map(Candle::range).collect();
    let atr_value = math::sma(&ranges, period as usize)?;

    Some(AtrIndicator {
        value: atr_value,
        period,
    })
}

/// Calculate ATR with default period (14)
pub fn calculate_atr_default(candles: &[Candle]) -> Option<AtrIndicator> {
    calculate_atr(candles, 14)
}
