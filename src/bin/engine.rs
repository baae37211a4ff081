//! Trendgate Engine
//!
//! Polls market data on a fixed interval, keeps the signal vault current,
//! fires alerts (and paper orders when enabled) through the trigger gate, and
//! serves the HTTP API.

use dotenvy::dotenv;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info};
use trendgate::config::EngineConfig;
use trendgate::core::clock::SystemClock;
use trendgate::core::http::{start_server, AppState};
use trendgate::core::runtime::SignalRuntime;
use trendgate::core::scheduler::CycleScheduler;
use trendgate::logging;
use trendgate::metrics::Metrics;
use trendgate::services::kraken::KrakenMarketDataProvider;
use trendgate::services::notifications::{
    LogNotificationSink, NotificationSink, WebhookNotificationSink,
};
use trendgate::services::venue::PaperTradeVenue;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables from .env if present
    dotenv().ok();

    logging::init_logging();

    let config = EngineConfig::from_env()?;
    let env = trendgate::config::get_environment();
    info!("Starting Trendgate Engine");
    info!(environment = %env, "Environment");
    info!(
        symbol = %config.symbol,
        interval = config.poll_interval_seconds,
        threshold = config.confidence_threshold,
        tiers = %config.leverage_tiers,
        execution = config.execution_enabled,
        "Polling {} every {}s",
        config.symbol,
        config.poll_interval_seconds
    );

    let metrics = Arc::new(Metrics::new()?);

    let provider = Arc::new(
        KrakenMarketDataProvider::new(config.kraken_base_url.clone(), &config.symbol)
            .with_min_bars(config.slow_period),
    );
    let sink: Arc<dyn NotificationSink> = match &config.webhook_url {
        Some(url) => {
            info!(url = %url, "Alerts go to webhook");
            Arc::new(WebhookNotificationSink::new(url.clone())?)
        }
        None => {
            info!("No webhook configured, alerts go to the log");
            Arc::new(LogNotificationSink)
        }
    };
    let venue = Arc::new(PaperTradeVenue::new());

    let runtime = Arc::new(SignalRuntime::from_config(
        &config,
        provider,
        sink,
        venue,
        Arc::new(SystemClock),
        Some(metrics.clone()),
    )?);

    let scheduler = CycleScheduler::new(runtime.clone(), config.poll_interval_seconds)?;
    scheduler.start().await;

    let state = AppState::new(runtime.clone(), metrics.clone());
    let port = config.http_port;
    let server_handle = tokio::spawn(async move {
        if let Err(e) = start_server(state, port).await {
            error!(error = %e, "HTTP server error");
        }
    });

    tokio::select! {
        _ = signal::ctrl_c() => {
            info!("Shutting down...");
        }
        _ = server_handle => {
            error!("HTTP server stopped");
        }
    }

    scheduler.stop().await;
    Ok(())
}
