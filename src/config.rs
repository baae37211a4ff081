//! Environment-driven configuration.
//!
//! Every option has a default; `TRENDGATE_*` variables override them. The
//! result is validated once at startup and any problem is a fatal
//! [`EngineError::ConfigurationError`].

use crate::error::EngineError;
use crate::execution::gate::MAX_COOLDOWN_SECONDS;
use crate::models::signal::Timeframe;
use crate::signals::aggregation::LeverageTierMap;
use crate::signals::decision::{RangeMultipliers, YieldModel};
use crate::signals::evaluator::TimeframeEvaluator;
use serde::Serialize;
use std::env;
use std::str::FromStr;

pub const DEFAULT_KRAKEN_URL: &str = "https://api.kraken.com";

/// Current deployment environment (`ENVIRONMENT`, default `sandbox`).
pub fn get_environment() -> String {
    env::var("ENVIRONMENT").unwrap_or_else(|_| "sandbox".to_string())
}

#[derive(Debug, Clone, Serialize)]
pub struct EngineConfig {
    pub symbol: String,
    pub poll_interval_seconds: u64,
    pub fetch_timeout_seconds: u64,
    pub cooldown_seconds: i64,
    pub confidence_threshold: u8,
    pub leverage_tiers: LeverageTierMap,
    pub capital_fraction: f64,
    pub timeframes: Vec<Timeframe>,
    pub fast_period: usize,
    pub slow_period: usize,
    pub atr_period: usize,
    pub anchor_timeframe: Timeframe,
    pub range_multipliers: RangeMultipliers,
    pub liquidation_buffer: f64,
    pub yield_model: YieldModel,
    pub activity_log_capacity: usize,
    pub notify_retries: usize,
    pub auto_trigger: bool,
    pub execution_enabled: bool,
    pub kraken_base_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub webhook_url: Option<String>,
    pub http_port: u16,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            symbol: "SOL/USD".to_string(),
            poll_interval_seconds: 60,
            fetch_timeout_seconds: 10,
            cooldown_seconds: 300,
            confidence_threshold: 4,
            leverage_tiers: LeverageTierMap::default(),
            capital_fraction: 0.05,
            timeframes: Timeframe::ALL.to_vec(),
            fast_period: 20,
            slow_period: 200,
            atr_period: 14,
            anchor_timeframe: Timeframe::D1,
            range_multipliers: RangeMultipliers::default(),
            liquidation_buffer: 0.45,
            yield_model: YieldModel::default(),
            activity_log_capacity: 50,
            notify_retries: 2,
            auto_trigger: true,
            execution_enabled: false,
            kraken_base_url: DEFAULT_KRAKEN_URL.to_string(),
            webhook_url: None,
            http_port: 8080,
        }
    }
}

impl EngineConfig {
    /// Load from the process environment (call `dotenvy::dotenv()` first).
    pub fn from_env() -> Result<Self, EngineError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load from an arbitrary key lookup; unset keys keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, EngineError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        if let Some(symbol) = get("TRENDGATE_SYMBOL") {
            config.symbol = symbol;
        }
        if let Some(v) = get("TRENDGATE_POLL_INTERVAL_SECONDS") {
            config.poll_interval_seconds = parse_number("TRENDGATE_POLL_INTERVAL_SECONDS", &v)?;
        }
        if let Some(v) = get("TRENDGATE_FETCH_TIMEOUT_SECONDS") {
            config.fetch_timeout_seconds = parse_number("TRENDGATE_FETCH_TIMEOUT_SECONDS", &v)?;
        }
        if let Some(v) = get("TRENDGATE_COOLDOWN_SECONDS") {
            config.cooldown_seconds = parse_number("TRENDGATE_COOLDOWN_SECONDS", &v)?;
        }
        if let Some(v) = get("TRENDGATE_CONFIDENCE_THRESHOLD") {
            config.confidence_threshold = parse_number("TRENDGATE_CONFIDENCE_THRESHOLD", &v)?;
        }
        if let Some(v) = get("TRENDGATE_LEVERAGE_TIERS") {
            config.leverage_tiers = LeverageTierMap::from_str(&v)?;
        }
        if let Some(v) = get("TRENDGATE_CAPITAL_FRACTION") {
            config.capital_fraction = parse_number("TRENDGATE_CAPITAL_FRACTION", &v)?;
        }
        if let Some(v) = get("TRENDGATE_TIMEFRAMES") {
            config.timeframes = parse_timeframes(&v)?;
        }
        if let Some(v) = get("TRENDGATE_FAST_PERIOD") {
            config.fast_period = parse_number("TRENDGATE_FAST_PERIOD", &v)?;
        }
        if let Some(v) = get("TRENDGATE_SLOW_PERIOD") {
            config.slow_period = parse_number("TRENDGATE_SLOW_PERIOD", &v)?;
        }
        if let Some(v) = get("TRENDGATE_ATR_PERIOD") {
            config.atr_period = parse_number("TRENDGATE_ATR_PERIOD", &v)?;
        }
        if let Some(v) = get("TRENDGATE_ANCHOR_TIMEFRAME") {
            config.anchor_timeframe = Timeframe::from_str(&v)?;
        }
        if let Some(v) = get("TRENDGATE_RANGE_MULTIPLIERS") {
            config.range_multipliers = RangeMultipliers::from_str(&v)?;
        }
        if let Some(v) = get("TRENDGATE_LIQUIDATION_BUFFER") {
            config.liquidation_buffer = parse_number("TRENDGATE_LIQUIDATION_BUFFER", &v)?;
        }
        if let Some(v) = get("TRENDGATE_ACCOUNT_CAPITAL") {
            config.yield_model.account_capital = parse_number("TRENDGATE_ACCOUNT_CAPITAL", &v)?;
        }
        if let Some(v) = get("TRENDGATE_DAILY_FEE_RATE") {
            config.yield_model.daily_fee_rate = parse_number("TRENDGATE_DAILY_FEE_RATE", &v)?;
        }
        if let Some(v) = get("TRENDGATE_REFERENCE_RANGE_FRACTION") {
            config.yield_model.reference_range_fraction =
                parse_number("TRENDGATE_REFERENCE_RANGE_FRACTION", &v)?;
        }
        if let Some(v) = get("TRENDGATE_ACTIVITY_LOG_CAPACITY") {
            config.activity_log_capacity = parse_number("TRENDGATE_ACTIVITY_LOG_CAPACITY", &v)?;
        }
        if let Some(v) = get("TRENDGATE_NOTIFY_RETRIES") {
            config.notify_retries = parse_number("TRENDGATE_NOTIFY_RETRIES", &v)?;
        }
        if let Some(v) = get("TRENDGATE_AUTO_TRIGGER") {
            config.auto_trigger = parse_flag("TRENDGATE_AUTO_TRIGGER", &v)?;
        }
        if let Some(v) = get("TRENDGATE_EXECUTION_ENABLED") {
            config.execution_enabled = parse_flag("TRENDGATE_EXECUTION_ENABLED", &v)?;
        }
        if let Some(url) = get("TRENDGATE_KRAKEN_URL") {
            config.kraken_base_url = url;
        }
        config.webhook_url = get("TRENDGATE_WEBHOOK_URL");
        if let Some(v) = get("PORT") {
            config.http_port = parse_number("PORT", &v)?;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        if self.symbol.is_empty() {
            return Err(EngineError::config("symbol must not be empty"));
        }
        if !(1..=3600).contains(&self.poll_interval_seconds) {
            return Err(EngineError::config(format!(
                "poll interval must be within 1..=3600 seconds, got {}",
                self.poll_interval_seconds
            )));
        }
        if self.fetch_timeout_seconds == 0 {
            return Err(EngineError::config("fetch timeout must be > 0"));
        }
        if !(0..=MAX_COOLDOWN_SECONDS).contains(&self.cooldown_seconds) {
            return Err(EngineError::config(format!(
                "cooldown must be within 0..={} seconds, got {}",
                MAX_COOLDOWN_SECONDS, self.cooldown_seconds
            )));
        }
        if self.confidence_threshold == 0
            || self.confidence_threshold as usize > Timeframe::ALL.len()
        {
            return Err(EngineError::config(format!(
                "confidence threshold must be within 1..=8, got {}",
                self.confidence_threshold
            )));
        }
        if self.leverage_tiers.min_confidence() > self.confidence_threshold {
            return Err(EngineError::config(format!(
                "leverage tier map starts at {} but threshold is {}",
                self.leverage_tiers.min_confidence(),
                self.confidence_threshold
            )));
        }
        if !(self.capital_fraction > 0.0 && self.capital_fraction <= 1.0) {
            return Err(EngineError::config(format!(
                "capital fraction must be within (0, 1], got {}",
                self.capital_fraction
            )));
        }
        if self.timeframes.is_empty() {
            return Err(EngineError::config("at least one timeframe must be monitored"));
        }
        TimeframeEvaluator::new(self.fast_period, self.slow_period, self.atr_period)?;
        if !self.timeframes.contains(&self.anchor_timeframe) {
            return Err(EngineError::config(format!(
                "anchor timeframe {} is not monitored",
                self.anchor_timeframe
            )));
        }
        if !(self.liquidation_buffer > 0.0 && self.liquidation_buffer < 1.0) {
            return Err(EngineError::config(format!(
                "liquidation buffer must be within (0, 1), got {}",
                self.liquidation_buffer
            )));
        }
        let yields = &self.yield_model;
        if !(yields.account_capital.is_finite() && yields.account_capital > 0.0) {
            return Err(EngineError::config(format!(
                "account capital must be > 0, got {}",
                yields.account_capital
            )));
        }
        if !(0.0..1.0).contains(&yields.daily_fee_rate) {
            return Err(EngineError::config(format!(
                "daily fee rate must be within [0, 1), got {}",
                yields.daily_fee_rate
            )));
        }
        if !(yields.reference_range_fraction.is_finite() && yields.reference_range_fraction > 0.0) {
            return Err(EngineError::config(format!(
                "reference range fraction must be > 0, got {}",
                yields.reference_range_fraction
            )));
        }
        if self.activity_log_capacity == 0 {
            return Err(EngineError::config("activity log capacity must be > 0"));
        }
        Ok(())
    }
}

/// Parse a comma-separated list of timeframe tags, rejecting unknown tags and
/// dropping duplicates. The result is ordered finest first.
pub fn parse_timeframes(raw: &str) -> Result<Vec<Timeframe>, EngineError> {
    let mut timeframes = raw
        .split(',')
        .filter(|tag| !tag.trim().is_empty())
        .map(Timeframe::from_str)
        .collect::<Result<Vec<_>, _>>()?;
    timeframes.sort();
    timeframes.dedup();
    Ok(timeframes)
}

fn parse_number<T: FromStr>(key: &str, raw: &str) -> Result<T, EngineError> {
    raw.parse()
        .map_err(|_| EngineError::config(format!("{} has invalid value '{}'", key, raw)))
}

fn parse_flag(key: &str, raw: &str) -> Result<bool, EngineError> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(EngineError::config(format!(
            "{} must be a boolean, got '{}'",
            key, raw
        ))),
    }
}
