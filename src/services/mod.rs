//! External collaborators: market data, notifications, trade venue.

pub mod kraken;
pub mod market_data;
pub mod notifications;
pub mod venue;

pub use kraken::KrakenMarketDataProvider;
pub use market_data::{InMemoryMarketDataProvider, MarketDataProvider};
pub use notifications::{LogNotificationSink, NotificationSink, WebhookNotificationSink};
pub use venue::{OrderId, PaperTradeVenue, TradeVenue};
