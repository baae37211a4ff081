//! Indicators computed from candle series.

pub mod trend;
pub mod volatility;
