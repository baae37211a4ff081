//! Integration tests for the HTTP API
//!
//! Tests health, metrics, vault and consensus views and the manual trigger.

use chrono::Duration;
use serde_json::{json, Value};
use trendgate::models::signal::Timeframe;

use crate::test_utils::{candles, TestApp};

#[tokio::test]
async fn health_endpoint_reports_healthy_status() {
    let app = TestApp::new().await;
    let response = app.server.get("/health").await;
    assert_eq!(response.status_code(), 200);

    let body: Value = response.json();
    assert_eq!(body["status"], "healthy");
    assert!(body["uptime_seconds"].as_u64().is_some());
    assert_eq!(body["service"], "trendgate-engine");
}

#[tokio::test]
async fn metrics_endpoint_exposes_prometheus_metrics() {
    let app = TestApp::new().await;
    app.runtime.run_cycle().await;

    let response = app.server.get("/metrics").await;
    assert_eq!(response.status_code(), 200);

    let body = response.text();
    assert!(body.contains("trendgate_http_requests_total"));
    assert!(body.contains("trendgate_http_request_duration_seconds"));
    assert!(body.contains("trendgate_cycles_total 1"));
    assert!(body.contains("trendgate_consensus_confidence 8"));
}

#[tokio::test]
async fn vault_lists_every_timeframe_before_first_cycle() {
    let app = TestApp::new().await;
    let body: Value = app.server.get("/api/vault").await.json();

    assert_eq!(body["cycle"], 0);
    let entries = body["entries"].as_array().unwrap();
    assert_eq!(entries.len(), 8);
    assert!(entries
        .iter()
        .all(|e| e["signal"]["direction"] == "Unavailable"));
}

#[tokio::test]
async fn vault_marks_failed_timeframe_stale() {
    let app = TestApp::new().await;
    app.runtime.run_cycle().await;
    app.provider.set_failure(Timeframe::H12, "HTTP 503").await;
    app.clock.advance(Duration::seconds(60));
    app.runtime.run_cycle().await;

    let body: Value = app.server.get("/api/vault").await.json();
    assert_eq!(body["cycle"], 2);

    let entries = body["entries"].as_array().unwrap();
    let h12 = entries.iter().find(|e| e["timeframe"] == "12h").unwrap();
    assert_eq!(h12["stale"], true);
    assert_eq!(h12["committed_cycle"], 1);
    assert_eq!(h12["signal"]["direction"], "Long");

    let h1 = entries.iter().find(|e| e["timeframe"] == "1h").unwrap();
    assert_eq!(h1["stale"], false);
}

#[tokio::test]
async fn consensus_is_null_until_first_cycle() {
    let app = TestApp::new().await;
    let body: Value = app.server.get("/api/consensus").await.json();
    assert!(body["consensus"].is_null());

    app.runtime.run_cycle().await;
    let body: Value = app.server.get("/api/consensus").await.json();
    assert_eq!(body["consensus"]["confidence"], 8);
    assert_eq!(body["consensus"]["bias"], "Long");
    assert_eq!(body["consensus"]["leverage_tier"], 5.0);
}

#[tokio::test]
async fn manual_trigger_without_data_conflicts() {
    let app = TestApp::new().await;
    let response = app.server.post("/api/trigger").json(&json!({})).await;
    assert_eq!(response.status_code(), 409);

    let body: Value = response.json();
    assert_eq!(body["outcome"], "not_planned");
    assert_eq!(body["detail"]["reason"], "neutral_bias");
}

#[tokio::test]
async fn manual_trigger_fires_then_cools_down() {
    let app = TestApp::new().await;
    app.runtime.run_cycle().await;

    let response = app.server.post("/api/trigger").json(&json!({})).await;
    assert_eq!(response.status_code(), 200);
    let body: Value = response.json();
    assert_eq!(body["outcome"], "fired");
    assert_eq!(body["detail"]["origin"], "Manual");
    assert_eq!(body["detail"]["side"], "Long");

    let response = app.server.post("/api/trigger").json(&json!({})).await;
    assert_eq!(response.status_code(), 409);
    let body: Value = response.json();
    assert_eq!(body["detail"]["reason"], "cooling_down");

    let gate: Value = app.server.get("/api/gate").await.json();
    assert_eq!(gate["long"]["state"], "cooling");
    assert_eq!(gate["long"]["remaining_secs"], 300);
    assert_eq!(gate["short"]["state"], "armed");

    let activity: Value = app.server.get("/api/activity").await.json();
    assert_eq!(activity["capacity"], 50);
    assert_eq!(activity["entries"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn manual_trigger_accepts_bare_post() {
    let app = TestApp::new().await;
    app.runtime.run_cycle().await;

    let response = app.server.post("/api/trigger").await;
    assert_eq!(response.status_code(), 200);
    let body: Value = response.json();
    assert_eq!(body["outcome"], "fired");
    assert_eq!(body["detail"]["origin"], "Manual");
}

#[tokio::test]
async fn manual_trigger_rejects_invalid_entry() {
    let app = TestApp::new().await;
    app.runtime.run_cycle().await;

    let response = app
        .server
        .post("/api/trigger")
        .json(&json!({ "entry_trigger": -1.0 }))
        .await;
    assert_eq!(response.status_code(), 400);
}

#[tokio::test]
async fn manual_trigger_respects_entry_override() {
    let app = TestApp::new().await;
    app.runtime.run_cycle().await;

    let response = app
        .server
        .post("/api/trigger")
        .json(&json!({ "entry_trigger": 150.0 }))
        .await;
    assert_eq!(response.status_code(), 409);
    let body: Value = response.json();
    assert_eq!(body["outcome"], "rejected");
    assert_eq!(body["detail"]["reason"], "price_condition_unmet");

    let activity: Value = app.server.get("/api/activity").await.json();
    assert!(activity["entries"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn manual_trigger_rejects_invalid_entry_without_cycle() {
    let app = TestApp::new().await;
    let response = app
        .server
        .post("/api/trigger")
        .json(&json!({ "entry_trigger": -1.0 }))
        .await;
    assert_eq!(response.status_code(), 400);
}

#[tokio::test]
async fn short_consensus_reported_over_http() {
    let app = TestApp::new().await;
    for tf in Timeframe::ALL {
        app.provider
            .set_series(tf, candles((101..=110).rev().map(f64::from)))
            .await;
    }
    app.runtime.run_cycle().await;

    let body: Value = app.server.get("/api/consensus").await.json();
    assert_eq!(body["consensus"]["bias"], "Short");
    assert_eq!(body["consensus"]["short_votes"], 8);
}
