//! Executes approved actions: alert, optional order, audit entry.

use crate::error::EngineError;
use crate::execution::activity::ActivityLog;
use crate::metrics::Metrics;
use crate::models::action::{
    ActionRequest, ActivityLogEntry, ActivityOutcome, ExecutionOutcome, FireOrigin,
    NotificationOutcome,
};
use crate::models::signal::Timeframe;
use crate::services::notifications::NotificationSink;
use crate::services::venue::TradeVenue;
use backon::{ExponentialBuilder, Retryable};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    pub symbol: String,
    pub execution_enabled: bool,
    /// Extra notification attempts after the first one.
    pub notify_retries: usize,
    pub retry_min_delay: Duration,
    pub activity_log_capacity: usize,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            symbol: "SOL/USD".to_string(),
            execution_enabled: false,
            notify_retries: 2,
            retry_min_delay: Duration::from_millis(500),
            activity_log_capacity: 50,
        }
    }
}

pub struct ActionDispatcher {
    config: DispatcherConfig,
    sink: Arc<dyn NotificationSink>,
    venue: Arc<dyn TradeVenue>,
    activity: ActivityLog,
    metrics: Option<Arc<Metrics>>,
}

impl ActionDispatcher {
    pub fn new(
        config: DispatcherConfig,
        sink: Arc<dyn NotificationSink>,
        venue: Arc<dyn TradeVenue>,
    ) -> Self {
        let activity = ActivityLog::new(config.activity_log_capacity);
        Self {
            config,
            sink,
            venue,
            activity,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn activity(&self) -> &ActivityLog {
        &self.activity
    }

    pub fn execution_enabled(&self) -> bool {
        self.config.execution_enabled
    }

    /// Notify, then submit if execution is enabled, then record.
    ///
    /// A failed notification does not stop the order, and every call leaves
    /// exactly one entry in the activity log.
    pub async fn dispatch(&self, request: &ActionRequest) -> ActivityLogEntry {
        let notification = self.notify(request).await;
        let execution = self.execute(request).await;

        let entry = ActivityLogEntry {
            timestamp: request.created_at,
            side: request.side,
            leverage: request.leverage_tier,
            origin: request.origin,
            outcome: ActivityOutcome {
                notification,
                execution,
            },
        };
        self.activity.push(entry.clone()).await;
        entry
    }

    async fn notify(&self, request: &ActionRequest) -> NotificationOutcome {
        let (subject, body) = compose_alert(&self.config.symbol, request);
        let sink = &self.sink;
        let backoff = ExponentialBuilder::default()
            .with_min_delay(self.config.retry_min_delay)
            .with_max_times(self.config.notify_retries);

        let result = (|| sink.send(&subject, &body))
            .retry(backoff)
            .sleep(tokio::time::sleep)
            .notify(|err: &EngineError, dur: Duration| {
                warn!(
                    error = %err,
                    retry_in_ms = dur.as_millis() as u64,
                    "ActionDispatcher: notification failed, retrying in {:?}",
                    dur
                );
            })
            .await;

        match result {
            Ok(()) => NotificationOutcome::Delivered,
            Err(e) => {
                error!(
                    side = %request.side,
                    error = %e,
                    "ActionDispatcher: notification for {} gave up: {}",
                    request.side,
                    e
                );
                if let Some(metrics) = &self.metrics {
                    metrics.notification_failures_total.inc();
                }
                NotificationOutcome::Failed(e.to_string())
            }
        }
    }

    async fn execute(&self, request: &ActionRequest) -> ExecutionOutcome {
        if !self.config.execution_enabled {
            return ExecutionOutcome::Disabled;
        }

        match self
            .venue
            .submit_order(request.side, request.capital_fraction, request.leverage_tier)
            .await
        {
            Ok(order_id) => {
                info!(
                    side = %request.side,
                    order_id = %order_id,
                    "ActionDispatcher: submitted {} order {}",
                    request.side,
                    order_id
                );
                ExecutionOutcome::Submitted { order_id }
            }
            Err(e) => {
                error!(
                    side = %request.side,
                    error = %e,
                    "ActionDispatcher: order submission failed: {}",
                    e
                );
                if let Some(metrics) = &self.metrics {
                    metrics.execution_failures_total.inc();
                }
                ExecutionOutcome::Failed {
                    reason: e.to_string(),
                }
            }
        }
    }
}

/// Alert subject and plain-text body for an action.
pub fn compose_alert(symbol: &str, request: &ActionRequest) -> (String, String) {
    let origin = match request.origin {
        FireOrigin::Auto => "auto",
        FireOrigin::Manual => "manual",
    };
    let scale = Timeframe::ALL.len();
    let subject = format!(
        "{} {} {}x ({}/{})",
        request.side, symbol, request.leverage_tier, request.confidence, scale
    );

    let mut lines = vec![
        format!("Side: {}", request.side),
        format!("Leverage: {}x", request.leverage_tier),
        format!("Capital: {:.1}%", request.capital_fraction * 100.0),
        format!("Position size: {:.2}", request.position_size),
        format!("Entry trigger: {:.4}", request.entry_trigger),
        format!("Take profit: {:.4}", request.take_profit),
        format!("Stop loss: {:.4}", request.stop_loss),
        format!("Reference price: {:.4}", request.reference_price),
    ];
    if let Some(liq) = request.liquidation_price {
        lines.push(format!("Est. liquidation: {:.4}", liq));
    }
    if request.stop_beyond_liquidation {
        lines.push("WARNING: stop loss lies beyond the estimated liquidation price".to_string());
    }
    if let Some(estimate) = request.estimated_yield {
        lines.push(format!("Range efficiency: {:.2}", estimate.range_efficiency));
        lines.push(format!("Est. daily yield: {:.2}", estimate.daily));
        lines.push(format!("Est. weekly yield: {:.2}", estimate.weekly));
    }
    lines.push(format!("Confidence: {}/{}", request.confidence, scale));
    lines.push(format!("Origin: {}", origin));
    lines.push(format!("At: {}", request.created_at.to_rfc3339()));

    let mut body = lines.join("\n");
    body.push('\n');
    (subject, body)
}
