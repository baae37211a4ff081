//! Prometheus metrics for the engine and its HTTP surface

use prometheus::{
    Encoder, Gauge, Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts,
    Registry, TextEncoder,
};

pub struct Metrics {
    registry: Registry,

    pub http_requests_total: IntCounter,
    pub http_request_duration_seconds: Histogram,
    pub http_requests_in_flight: IntGauge,

    pub cycles_total: IntCounter,
    pub cycles_skipped_total: IntCounter,
    pub cycle_duration_seconds: Histogram,
    pub fetch_failures_total: IntCounterVec,
    pub unavailable_signals_total: IntCounter,
    pub consensus_confidence: Gauge,

    pub fires_total: IntCounterVec,
    pub fires_suppressed_total: IntCounterVec,
    pub notification_failures_total: IntCounter,
    pub execution_failures_total: IntCounter,
}

impl Metrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let http_requests_total = IntCounter::new(
            "trendgate_http_requests_total",
            "Total HTTP requests served",
        )?;
        let http_request_duration_seconds = Histogram::with_opts(HistogramOpts::new(
            "trendgate_http_request_duration_seconds",
            "HTTP request latency",
        ))?;
        let http_requests_in_flight = IntGauge::new(
            "trendgate_http_requests_in_flight",
            "HTTP requests currently being served",
        )?;

        let cycles_total =
            IntCounter::new("trendgate_cycles_total", "Poll cycles committed to the vault")?;
        let cycles_skipped_total = IntCounter::new(
            "trendgate_cycles_skipped_total",
            "Poll ticks dropped because a cycle was still running",
        )?;
        let cycle_duration_seconds = Histogram::with_opts(
            HistogramOpts::new("trendgate_cycle_duration_seconds", "Poll cycle duration")
                .buckets(vec![0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]),
        )?;
        let fetch_failures_total = IntCounterVec::new(
            Opts::new(
                "trendgate_fetch_failures_total",
                "Market data fetches that failed or timed out",
            ),
            &["timeframe"],
        )?;
        let unavailable_signals_total = IntCounter::new(
            "trendgate_unavailable_signals_total",
            "Timeframes evaluated as unavailable for lack of history",
        )?;
        let consensus_confidence = Gauge::new(
            "trendgate_consensus_confidence",
            "Confidence of the latest consensus",
        )?;

        let fires_total = IntCounterVec::new(
            Opts::new("trendgate_fires_total", "Actions that passed the trigger gate"),
            &["side", "origin"],
        )?;
        let fires_suppressed_total = IntCounterVec::new(
            Opts::new(
                "trendgate_fires_suppressed_total",
                "Trigger attempts rejected by the gate",
            ),
            &["reason"],
        )?;
        let notification_failures_total = IntCounter::new(
            "trendgate_notification_failures_total",
            "Alerts that could not be delivered after retries",
        )?;
        let execution_failures_total = IntCounter::new(
            "trendgate_execution_failures_total",
            "Order submissions that failed",
        )?;

        registry.register(Box::new(http_requests_total.clone()))?;
        registry.register(Box::new(http_request_duration_seconds.clone()))?;
        registry.register(Box::new(http_requests_in_flight.clone()))?;
        registry.register(Box::new(cycles_total.clone()))?;
        registry.register(Box::new(cycles_skipped_total.clone()))?;
        registry.register(Box::new(cycle_duration_seconds.clone()))?;
        registry.register(Box::new(fetch_failures_total.clone()))?;
        registry.register(Box::new(unavailable_signals_total.clone()))?;
        registry.register(Box::new(consensus_confidence.clone()))?;
        registry.register(Box::new(fires_total.clone()))?;
        registry.register(Box::new(fires_suppressed_total.clone()))?;
        registry.register(Box::new(notification_failures_total.clone()))?;
        registry.register(Box::new(execution_failures_total.clone()))?;

        Ok(Self {
            registry,
            http_requests_total,
            http_request_duration_seconds,
            http_requests_in_flight,
            cycles_total,
            cycles_skipped_total,
            cycle_duration_seconds,
            fetch_failures_total,
            unavailable_signals_total,
            consensus_confidence,
            fires_total,
            fires_suppressed_total,
            notification_failures_total,
            execution_failures_total,
        })
    }

    /// Text exposition format for `/metrics`.
    pub fn export(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}
