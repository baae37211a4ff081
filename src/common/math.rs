//! Moving averages over plain price slices.

/// Exponential moving average with `span` smoothing, seeded by the first
/// value (alpha = 2 / (period + 1), no bias adjustment).
///
/// Returns `None` when fewer than `period` values are available.
pub fn ema(values: &[f64], period: usize) -> Option<f64> {
    if period == 0 || values.len() < period {
        return None;
    }

    let alpha = 2.0 / (period as f64 + 1.0);
    let mut iter = values.iter();
    let mut current = *iter.next()?;
    for value in iter {
        current = alpha * value + (1.0 - alpha) * current;
    }
    Some(current)
}

/// Simple moving average of the last `period` values.
pub fn sma(values: &[f64], period: usize) -> Option<f64> {
    if period == 0 || values.len() < period {
        return None;
    }

    let window = &values[values.len() - period..];
    Some(window.iter().sum::<f64>() / period as f64)
}
