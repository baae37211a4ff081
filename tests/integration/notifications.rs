//! Integration tests for webhook alerts

use chrono::Utc;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio_test::assert_ok;
use trendgate::error::EngineError;
use trendgate::execution::dispatcher::{ActionDispatcher, DispatcherConfig};
use trendgate::models::action::{ActionRequest, ExecutionOutcome, FireOrigin, NotificationOutcome};
use trendgate::models::signal::Side;
use trendgate::services::notifications::{NotificationSink, WebhookNotificationSink};
use trendgate::services::venue::PaperTradeVenue;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn request() -> ActionRequest {
    ActionRequest {
        side: Side::Short,
        leverage_tier: 2.0,
        capital_fraction: 0.05,
        entry_trigger: 150.0,
        take_profit: 120.0,
        stop_loss: 165.0,
        confidence: 4,
        reference_price: 148.0,
        liquidation_price: Some(181.3),
        stop_beyond_liquidation: false,
        position_size: 1000.0,
        estimated_yield: None,
        origin: FireOrigin::Auto,
        created_at: Utc::now(),
    }
}

#[tokio::test]
async fn webhook_posts_subject_and_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/hook"))
        .and(body_string_contains("SHORT SOL/USD"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let sink = WebhookNotificationSink::new(format!("{}/hook", server.uri())).unwrap();
    assert_ok!(sink.send("SHORT SOL/USD 2x (4/8)", "Side: SHORT").await);

    let received = server.received_requests().await.unwrap();
    let body: Value = serde_json::from_slice(&received[0].body).unwrap();
    assert_eq!(body["subject"], "SHORT SOL/USD 2x (4/8)");
    assert_eq!(body["body"], "Side: SHORT");
}

#[tokio::test]
async fn webhook_error_status_is_notification_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let sink = WebhookNotificationSink::new(server.uri()).unwrap();
    let err = sink.send("subject", "body").await.unwrap_err();
    assert!(matches!(err, EngineError::NotificationFailure(_)));
}

#[tokio::test]
async fn dispatcher_retries_webhook_then_still_executes() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503))
        .expect(2)
        .mount(&server)
        .await;

    let venue = Arc::new(PaperTradeVenue::new());
    let dispatcher = ActionDispatcher::new(
        DispatcherConfig {
            execution_enabled: true,
            notify_retries: 1,
            retry_min_delay: Duration::from_millis(5),
            ..DispatcherConfig::default()
        },
        Arc::new(WebhookNotificationSink::new(server.uri()).unwrap()),
        venue.clone(),
    );

    let entry = dispatcher.dispatch(&request()).await;
    assert!(matches!(
        entry.outcome.notification,
        NotificationOutcome::Failed(ref detail) if detail.contains("503")
    ));
    assert!(matches!(
        entry.outcome.execution,
        ExecutionOutcome::Submitted { .. }
    ));
    let orders = venue.orders().await;
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0].side, Side::Short);
    assert_eq!(orders[0].leverage, 2.0);
}
