//! Fixed-interval ticker driving poll cycles

use crate::core::runtime::{CycleOutcome, SignalRuntime};
use crate::error::EngineError;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

/// Scheduler that starts a poll cycle on every tick.
///
/// Each tick spawns its cycle, so a slow cycle never delays the ticker; a
/// tick landing while a cycle is still running finds the poll-lock held and
/// is dropped by the runtime.
pub struct CycleScheduler {
    runtime: Arc<SignalRuntime>,
    interval: Duration,
    handle: Arc<RwLock<Option<tokio::task::JoinHandle<()>>>>,
}

impl CycleScheduler {
    /// Create a new scheduler
    ///
    /// # Arguments
    /// * `runtime` - Runtime whose cycles are driven
    /// * `interval_seconds` - Poll interval in seconds (must be > 0)
    pub fn new(runtime: Arc<SignalRuntime>, interval_seconds: u64) -> Result<Self, EngineError> {
        if interval_seconds == 0 {
            return Err(EngineError::config("poll interval must be > 0"));
        }

        info!(
            interval = interval_seconds,
            timeframes = runtime.timeframes().len(),
            "CycleScheduler: created with interval {}s",
            interval_seconds
        );

        Ok(Self {
            runtime,
            interval: Duration::from_secs(interval_seconds),
            handle: Arc::new(RwLock::new(None)),
        })
    }

    /// Start ticking. The first cycle runs immediately.
    pub async fn start(&self) {
        let mut slot = self.handle.write().await;
        if slot.is_some() {
            debug!("CycleScheduler: already running");
            return;
        }

        let runtime = self.runtime.clone();
        let period = self.interval;
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                ticker.tick().await;
                let runtime = runtime.clone();
                tokio::spawn(async move {
                    if let CycleOutcome::Completed(report) = runtime.run_cycle().await {
                        debug!(
                            cycle = report.cycle,
                            refreshed = report.refreshed.len(),
                            failed = report.failed.len(),
                            "CycleScheduler: cycle {} done",
                            report.cycle
                        );
                    }
                });
            }
        });
        *slot = Some(handle);

        info!("CycleScheduler: started successfully");
    }

    /// Stop the scheduler
    pub async fn stop(&self) {
        let mut handle = self.handle.write().await;
        if let Some(h) = handle.take() {
            h.abort();
            info!("CycleScheduler: stopped");
        }
    }

    /// Check if the scheduler is running
    pub async fn is_running(&self) -> bool {
        let handle = self.handle.read().await;
        handle.is_some()
    }
}
