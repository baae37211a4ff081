//! Kraken public REST market data.

pub mod messages;
pub mod provider;

pub use provider::KrakenMarketDataProvider;
