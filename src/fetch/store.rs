//! The current feature set, shared between evaluating callers and the refresher.
//!
//! Readers load the current [`Snapshot`] through an [`ArcSwap`], so they never wait on a
//! writer and always see one complete snapshot.

use crate::model::feature::{Feature, Snapshot};
use arc_swap::ArcSwap;
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

const NEVER: i64 = i64::MIN;

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum PublishOutcome {
    Published,
    Unchanged,
}

pub struct SnapshotStore {
    current: ArcSwap<Snapshot>,
    last_check: AtomicI64,
}

impl SnapshotStore {
    pub fn new() -> Self {
        Self {
            current: ArcSwap::from_pointee(Snapshot::default()),
            last_check: AtomicI64::new(NEVER),
        }
    }

    pub fn get(&self, name: &str) -> Option<Arc<Feature>> {
        self.current.load().features.get(name).cloned()
    }

    pub fn current(&self) -> Arc<Snapshot> {
        self.current.load_full()
    }

    /// Makes `snapshot` the current one unless it is identical to the current snapshot.
    ///
    /// Either way, the last successful check time is refreshed. Callers must not publish
    /// concurrently.
    pub fn publish(&self, snapshot: Snapshot) -> PublishOutcome {
        let outcome = if **self.current.load() == snapshot {
            PublishOutcome::Unchanged
        } else {
            self.current.store(Arc::new(snapshot));
            PublishOutcome::Published
        };
        self.touch();
        outcome
    }

    /// Installs a snapshot restored from a backup. Does not count as a successful check.
    pub fn restore(&self, snapshot: Snapshot) {
        self.current.store(Arc::new(snapshot));
    }

    pub fn touch(&self) {
        self.last_check
            .store(Utc::now().timestamp_millis(), Ordering::SeqCst);
    }

    pub fn last_check(&self) -> Option<DateTime<Utc>> {
        match self.last_check.load(Ordering::SeqCst) {
            NEVER => None,
            millis => DateTime::from_timestamp_millis(millis),
        }
    }
}

impl Default for SnapshotStore {
    fn default() -> Self {
        Self::new()
    }
}
