//! Trendgate: multi-timeframe consensus signal and trigger engine.
//!
//! A fixed-interval poll cycle evaluates eight timeframes, commits the
//! successful verdicts into the [`signals::vault::SignalVault`], reduces the
//! snapshot to a confidence-scored consensus and, when the trigger gate allows
//! it, dispatches an alert and optionally an order.

pub mod common;
pub mod config;
pub mod core;
pub mod error;
pub mod execution;
pub mod indicators;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod services;
pub mod signals;

pub use error::EngineError;
