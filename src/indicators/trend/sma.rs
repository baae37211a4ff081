//! SMA (Simple Moving Average) indicator

use crate::common::math;
use crate::models::indicators::{Candle, SmaIndicator};

/// Calculate SMA of the last `period` closes
pub fn calculate_sma(candles: &[Candle], period: u32) -> Option<SmaIndicator> {
    if candles.len() < period as usize {
        return None;
    }

    let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();
    let sma_value = math::sma(&closes, period as usize)?;

    Some(SmaIndicator {
        value: sma_value,
        period,
    })
}

/// Calculate SMA with the default slow period (200)
pub fn calculate_sma_default(candles: &[Candle]) -> Option<SmaIndicator> {
    calculate_sma(candles, 200)
}
