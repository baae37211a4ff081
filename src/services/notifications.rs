//! Notification sinks for fired actions

use crate::error::EngineError;
use serde_json::json;
use std::time::Duration;
use tracing::info;

#[async_trait::async_trait]
pub trait NotificationSink: Send + Sync {
    async fn send(&self, subject: &str, body: &str) -> Result<(), EngineError>;
}

/// Writes alerts to the structured log; used when no webhook is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotificationSink;

#[async_trait::async_trait]
impl NotificationSink for LogNotificationSink {
    async fn send(&self, subject: &str, body: &str) -> Result<(), EngineError> {
        info!(subject = %subject, body = %body, "ALERT: {}", subject);
        Ok(())
    }
}

/// POSTs `{"subject": .., "body": ..}` as JSON to a webhook URL.
pub struct WebhookNotificationSink {
    client: reqwest::Client,
    url: String,
}

impl WebhookNotificationSink {
    pub fn new(url: impl Into<String>) -> Result<Self, EngineError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| EngineError::config(format!("failed to build webhook client: {}", e)))?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait::async_trait]
impl NotificationSink for WebhookNotificationSink {
    async fn send(&self, subject: &str, body: &str) -> Result<(), EngineError> {
        let response = self
            .client
            .post(&self.url)
            .json(&json!({ "subject": subject, "body": body }))
            .send()
            .await
            .map_err(|e| {
                EngineError::NotificationFailure(format!("webhook request failed: {}", e))
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(EngineError::NotificationFailure(format!(
                "webhook returned HTTP {}",
                status
            )));
        }
        Ok(())
    }
}
