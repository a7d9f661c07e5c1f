//! Shared gate between the synchronizer and foreground command handlers.
//!
//! Handlers check [`SyncGate::is_synchronizing`] before touching the store
//! and answer with a uniform "service temporarily unavailable" reply while
//! a sync cycle runs. The gate also tracks every client id that has talked
//! to the service so cycle pause/resume notices can be broadcast.
//!
//! Two independent locks: registration happens on every `/start` while the
//! sync flag flips twice a day, so neither path may contend on the other.

use parking_lot::Mutex;
use std::collections::BTreeSet;

/// Whether a sync cycle is currently running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    Idle,
    Synchronizing,
}

/// Process-wide gate: sync flag plus the known-client registry.
#[derive(Debug)]
pub struct SyncGate {
    state: Mutex<SyncState>,
    clients: Mutex<BTreeSet<i64>>,
}

impl SyncGate {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(SyncState::Idle),
            clients: Mutex::new(BTreeSet::new()),
        }
    }

    /// True strictly between [`begin_cycle`](Self::begin_cycle) and its
    /// matching [`end_cycle`](Self::end_cycle).
    pub fn is_synchronizing(&self) -> bool {
        *self.state.lock() == SyncState::Synchronizing
    }

    /// Mark the start of a sync cycle. Called exactly once per cycle,
    /// before any remote fetch.
    pub fn begin_cycle(&self) {
        *self.state.lock() = SyncState::Synchronizing;
    }

    /// Mark the end of a sync cycle. Called exactly once per cycle on
    /// every exit path, success or failure, so handlers never see a stuck
    /// busy flag.
    pub fn end_cycle(&self) {
        *self.state.lock() = SyncState::Idle;
    }

    /// Remember a client id. Idempotent; safe to call from concurrent
    /// handlers while the synchronizer snapshots the registry.
    pub fn register_client(&self, id: i64) {
        self.clients.lock().insert(id);
    }

    /// Snapshot of the known client ids. Callers iterate the copy, so
    /// concurrent registrations never invalidate the iteration.
    pub fn list_clients(&self) -> Vec<i64> {
        self.clients.lock().iter().copied().collect()
    }
}

impl Default for SyncGate {
    fn default() -> Self {
        Self::new()
    }
}
