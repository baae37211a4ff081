//! HTTP endpoint server using Axum

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;
use tower::ServiceBuilder;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::{info, Level};

use crate::core::runtime::{SignalRuntime, TriggerOutcome};
use crate::metrics::Metrics;
use crate::models::signal::{Side, Timeframe, TimeframeSignal};

#[derive(Clone)]
pub struct AppState {
    pub health: Arc<RwLock<HealthStatus>>,
    pub metrics: Arc<Metrics>,
    pub start_time: Arc<Instant>,
    pub runtime: Arc<SignalRuntime>,
}

impl AppState {
    pub fn new(runtime: Arc<SignalRuntime>, metrics: Arc<Metrics>) -> Self {
        Self {
            health: Arc::new(RwLock::new(HealthStatus::default())),
            metrics,
            start_time: Arc::new(Instant::now()),
            runtime,
        }
    }
}

#[derive(Clone, Debug)]
pub struct HealthStatus {
    pub status: String,
}

impl Default for HealthStatus {
    fn default() -> Self {
        Self {
            status: "healthy".to_string(),
        }
    }
}

pub async fn health_check(State(state): State<AppState>) -> Result<Json<Value>, StatusCode> {
    let health = state.health.read().await;
    let uptime_seconds = state.start_time.elapsed().as_secs();
    Ok(Json(json!({
        "status": health.status,
        "uptime_seconds": uptime_seconds,
        "service": "trendgate-engine"
    })))
}

pub async fn metrics_handler(State(state): State<AppState>) -> Result<String, StatusCode> {
    state
        .metrics
        .export()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)
}

/// Middleware to track HTTP request metrics
async fn metrics_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    state.metrics.http_requests_in_flight.inc();

    let response = next.run(request).await;
    let status = response.status();
    let duration = start.elapsed();

    state.metrics.http_requests_in_flight.dec();

    state.metrics.http_requests_total.inc();
    state
        .metrics
        .http_request_duration_seconds
        .observe(duration.as_secs_f64());

    if status.is_server_error() {
        tracing::error!(
            method = %method,
            path = %path,
            status = %status,
            duration_ms = duration.as_millis(),
            "HTTP request error"
        );
    }

    response
}

#[derive(Debug, Serialize)]
struct VaultEntryView {
    timeframe: Timeframe,
    /// Not refreshed in the latest cycle.
    stale: bool,
    committed_cycle: u64,
    signal: TimeframeSignal,
}

#[derive(Debug, Serialize)]
struct VaultView {
    cycle: u64,
    committed_at: Option<DateTime<Utc>>,
    entries: Vec<VaultEntryView>,
}

/// Latest verdict per monitored timeframe, with stale annotations
async fn get_vault(State(state): State<AppState>) -> Json<VaultView> {
    let snapshot = state.runtime.vault().snapshot().await;
    let entries = state
        .runtime
        .timeframes()
        .iter()
        .map(|&tf| {
            let entry = snapshot.entry(tf);
            VaultEntryView {
                timeframe: tf,
                stale: snapshot.is_stale(tf),
                committed_cycle: entry.cycle,
                signal: entry.signal.clone(),
            }
        })
        .collect();

    Json(VaultView {
        cycle: snapshot.cycle,
        committed_at: snapshot.committed_at,
        entries,
    })
}

async fn get_consensus(State(state): State<AppState>) -> Json<Value> {
    let consensus = state.runtime.latest_consensus().await;
    Json(json!({ "consensus": consensus }))
}

async fn get_activity(State(state): State<AppState>) -> Json<Value> {
    let activity = state.runtime.dispatcher().activity();
    let entries = activity.recent().await;
    Json(json!({
        "capacity": activity.capacity(),
        "entries": entries,
    }))
}

async fn get_gate(State(state): State<AppState>) -> Json<Value> {
    let gate = state.runtime.gate();
    Json(json!({
        "threshold": gate.threshold(),
        "long": gate.state(Side::Long).await,
        "short": gate.state(Side::Short).await,
        "execution_enabled": state.runtime.dispatcher().execution_enabled(),
    }))
}

#[derive(Debug, Default, Deserialize)]
struct TriggerRequest {
    #[serde(default)]
    entry_trigger: Option<f64>,
}

/// Manual fire; 200 when dispatched, 409 when planning or the gate refused.
/// The JSON body is optional.
async fn post_trigger(
    State(state): State<AppState>,
    request: Option<Json<TriggerRequest>>,
) -> Result<Response, StatusCode> {
    let entry_trigger = request.and_then(|Json(request)| request.entry_trigger);
    if let Some(entry) = entry_trigger {
        if !(entry.is_finite() && entry > 0.0) {
            return Err(StatusCode::BAD_REQUEST);
        }
    }

    let outcome = state.runtime.manual_fire(entry_trigger).await;
    let status = match outcome {
        TriggerOutcome::Fired(_) => StatusCode::OK,
        TriggerOutcome::NotPlanned(_) | TriggerOutcome::Rejected(_) => StatusCode::CONFLICT,
    };
    Ok((status, Json(outcome)).into_response())
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/metrics", get(metrics_handler))
        .route("/api/vault", get(get_vault))
        .route("/api/consensus", get(get_consensus))
        .route("/api/activity", get(get_activity))
        .route("/api/gate", get(get_gate))
        .route("/api/trigger", post(post_trigger))
        .layer(
            ServiceBuilder::new()
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(DefaultMakeSpan::new().level(Level::DEBUG))
                        .on_request(DefaultOnRequest::new().level(Level::DEBUG))
                        .on_response(DefaultOnResponse::new().level(Level::DEBUG)),
                )
                .layer(axum::middleware::from_fn_with_state(
                    state.clone(),
                    metrics_middleware,
                ))
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

pub async fn start_server(state: AppState, port: u16) -> Result<(), Box<dyn std::error::Error>> {
    let app = create_router(state);
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;

    info!(port = port, "HTTP server listening on port {}", port);
    info!(
        "Metrics endpoint available at http://0.0.0.0:{}/metrics",
        port
    );
    axum::serve(listener, app).await?;

    Ok(())
}
