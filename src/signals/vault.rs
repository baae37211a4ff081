//! SignalVault: the always-complete cache of per-timeframe verdicts.
//!
//! Readers get an immutable [`VaultSnapshot`] from some completed cycle. A
//! cycle stages its successful reads and swaps a new snapshot in with one
//! write; timeframes that failed keep their previous entry.

use crate::models::signal::{Timeframe, TimeframeSignal};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use tracing::{debug, info};

/// A committed signal and the cycle that committed it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VaultEntry {
    pub signal: TimeframeSignal,
    pub cycle: u64,
}

/// Consistent view of every timeframe as of one completed cycle.
#[derive(Debug, Clone, Serialize)]
pub struct VaultSnapshot {
    pub cycle: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub committed_at: Option<DateTime<Utc>>,
    entries: BTreeMap<Timeframe, VaultEntry>,
}

impl VaultSnapshot {
    fn seeded(at: DateTime<Utc>) -> Self {
        let entries = Timeframe::ALL
            .into_iter()
            .map(|tf| {
                (
                    tf,
                    VaultEntry {
                        signal: TimeframeSignal::unavailable(tf, at),
                        cycle: 0,
                    },
                )
            })
            .collect();
        Self {
            cycle: 0,
            committed_at: None,
            entries,
        }
    }

    /// Last known signal; every timeframe is always present.
    pub fn get(&self, timeframe: Timeframe) -> &TimeframeSignal {
        &self.entry(timeframe).signal
    }

    pub fn entry(&self, timeframe: Timeframe) -> &VaultEntry {
        // seeded with every variant and never shrunk
        &self.entries[&timeframe]
    }

    /// True when the entry was committed before the latest cycle.
    pub fn is_stale(&self, timeframe: Timeframe) -> bool {
        self.entry(timeframe).cycle < self.cycle
    }

    /// Signals finest timeframe first.
    pub fn signals(&self) -> impl Iterator<Item = &TimeframeSignal> {
        self.entries.values().map(|e| &e.signal)
    }

    /// Signals restricted to `timeframes`.
    pub fn signals_for<'a>(
        &'a self,
        timeframes: &'a [Timeframe],
    ) -> impl Iterator<Item = &'a TimeframeSignal> {
        self.entries
            .iter()
            .filter(move |(tf, _)| timeframes.contains(tf))
            .map(|(_, e)| &e.signal)
    }

    pub fn entries(&self) -> impl Iterator<Item = (&Timeframe, &VaultEntry)> {
        self.entries.iter()
    }
}

/// Proof that the holder owns the poll-lock for one cycle.
pub struct PollGuard {
    _guard: OwnedMutexGuard<()>,
}

pub struct SignalVault {
    current: RwLock<Arc<VaultSnapshot>>,
    poll_lock: Arc<Mutex<()>>,
}

impl SignalVault {
    /// Create a vault with every timeframe seeded as `Unavailable`.
    pub fn new(seeded_at: DateTime<Utc>) -> Self {
        Self {
            current: RwLock::new(Arc::new(VaultSnapshot::seeded(seeded_at))),
            poll_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Last known signal for `timeframe` (possibly stale, never absent).
    pub async fn get(&self, timeframe: Timeframe) -> TimeframeSignal {
        self.current.read().await.get(timeframe).clone()
    }

    pub async fn snapshot(&self) -> Arc<VaultSnapshot> {
        self.current.read().await.clone()
    }

    /// Try to take the poll-lock without waiting.
    ///
    /// `None` means a previous cycle has not committed yet; the caller drops
    /// its cycle instead of queueing behind it.
    pub fn begin_cycle(&self) -> Option<PollGuard> {
        self.poll_lock
            .clone()
            .try_lock_owned()
            .ok()
            .map(|guard| PollGuard { _guard: guard })
    }

    /// Merge the timeframes that fetched successfully this cycle as one batch.
    ///
    /// A staged signal older than the committed one is ignored so entries only
    /// move forward in time. Consumes the poll guard, releasing the lock once
    /// the new snapshot is visible.
    pub async fn stage_and_commit(
        &self,
        guard: PollGuard,
        staged: HashMap<Timeframe, TimeframeSignal>,
        committed_at: DateTime<Utc>,
    ) -> Arc<VaultSnapshot> {
        let mut current = self.current.write().await;
        let mut next = (**current).clone();
        next.cycle += 1;
        next.committed_at = Some(committed_at);

        let mut applied = 0usize;
        for (timeframe, signal) in staged {
            let Some(entry) = next.entries.get_mut(&timeframe) else {
                continue;
            };
            if signal.last_updated < entry.signal.last_updated {
                debug!(
                    timeframe = %timeframe,
                    "SignalVault: ignoring out-of-date signal for {}",
                    timeframe
                );
                continue;
            }
            *entry = VaultEntry {
                signal,
                cycle: next.cycle,
            };
            applied += 1;
        }

        let next = Arc::new(next);
        *current = next.clone();
        drop(current);
        drop(guard);

        info!(
            cycle = next.cycle,
            applied = applied,
            "SignalVault: committed cycle {} ({} timeframes refreshed)",
            next.cycle,
            applied
        );
        next
    }
}
