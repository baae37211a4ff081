//! Bounded in-memory audit trail of dispatched actions

use crate::models::action::ActivityLogEntry;
use std::collections::VecDeque;
use tokio::sync::RwLock;

pub const DEFAULT_ACTIVITY_CAPACITY: usize = 50;

#[derive(Debug)]
pub struct ActivityLog {
    capacity: usize,
    entries: RwLock<VecDeque<ActivityLogEntry>>,
}

impl Default for ActivityLog {
    fn default() -> Self {
        Self::new(DEFAULT_ACTIVITY_CAPACITY)
    }
}

impl ActivityLog {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            entries: RwLock::new(VecDeque::with_capacity(capacity)),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Append, evicting the oldest entries beyond capacity.
    pub async fn push(&self, entry: ActivityLogEntry) {
        let mut entries = self.entries.write().await;
        entries.push_back(entry);
        while entries.len() > self.capacity {
            entries.pop_front();
        }
    }

    /// Entries, newest first.
    pub async fn recent(&self) -> Vec<ActivityLogEntry> {
        self.entries.read().await.iter().rev().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}
