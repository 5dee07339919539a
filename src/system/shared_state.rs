//! Shared state between concurrent planner workers.
//!
//! The `SharedState` struct owns the entry store and the exploration frontier.
//! Workers sample and raycast without holding any lock; only the final
//! commit takes the store write lock.
//!
//! Lock order is always store before frontier.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::{info, warn};

use crate::graph::{EntryStore, ViewpointEntry, ViewpointEntryIndex};
use crate::planner::ExplorationFrontier;

/// State shared by every worker of one planner.
pub struct SharedState {
    /// Committed entries, spatial index, graph and density bookkeeping.
    /// Protected by RwLock: closeness checks read, commits write.
    pub store: RwLock<EntryStore>,

    /// Entries pending axis-aligned expansion.
    pub frontier: Mutex<ExplorationFrontier>,

    /// Consecutive failed sampling attempts since the last commit.
    failed_samples: AtomicUsize,
}

impl SharedState {
    pub fn new(store: EntryStore) -> Arc<Self> {
        Arc::new(Self {
            store: RwLock::new(store),
            frontier: Mutex::new(ExplorationFrontier::new()),
            failed_samples: AtomicUsize::new(0),
        })
    }

    /// Commit `entry` as one transaction.
    ///
    /// With `register_frontier` the new index is pushed onto the frontier
    /// before the store lock is released, so no reader sees the entry
    /// without its frontier registration.
    pub fn commit(
        &self,
        entry: ViewpointEntry,
        count_in_grid: bool,
        register_frontier: bool,
    ) -> ViewpointEntryIndex {
        let mut store = self.store.write();
        let index = store.commit(entry, count_in_grid);
        if register_frontier {
            self.frontier.lock().push(index);
        }
        self.failed_samples.store(0, Ordering::SeqCst);
        index
    }

    /// Drop all virtual entries, clear the frontier and the failure counter.
    pub fn reset(&self) {
        let mut store = self.store.write();
        self.reset_locked(&mut store);
    }

    /// Reset if the store holds exactly one virtual entry and at least
    /// `max_failures` attempts to add another have failed.
    ///
    /// The condition is evaluated under the same write lock as the reset,
    /// so a commit from another worker either lands before the check or
    /// after the reset. Returns whether a reset happened.
    pub fn reset_if_stuck(&self, max_failures: usize) -> bool {
        let mut store = self.store.write();
        let failures = self.failed_samples.load(Ordering::SeqCst);
        if store.len() != store.num_real_viewpoints() + 1 || failures < max_failures {
            return false;
        }
        warn!(
            failures,
            "Too many failed attempts to sample the second viewpoint, resetting viewpoint graph"
        );
        self.reset_locked(&mut store);
        true
    }

    fn reset_locked(&self, store: &mut EntryStore) {
        store.reset();
        self.frontier.lock().clear();
        self.failed_samples.store(0, Ordering::SeqCst);
        info!(num_real = store.num_real_viewpoints(), "Viewpoint graph reset");
    }

    pub fn num_failed_samples(&self) -> usize {
        self.failed_samples.load(Ordering::SeqCst)
    }

    /// Record one failed sampling attempt and return the new count.
    pub fn record_failure(&self) -> usize {
        self.failed_samples.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn len(&self) -> usize {
        self.store.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.read().is_empty()
    }

    pub fn frontier_len(&self) -> usize {
        self.frontier.lock().len()
    }
}
