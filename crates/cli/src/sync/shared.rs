// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Queue state shared between the engine, the dispatcher and subscribers.
//!
//! Every write to the store goes through [`SharedQueue::with_store`], which
//! publishes a fresh [`QueueState`] while the store lock is still held. That
//! keeps published snapshots in the same order as the writes that produced
//! them.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;

use tally_core::QueueState;
use tokio::sync::watch;

use super::store::QueueStore;
use crate::error::Result;

/// Store, status flags and change channel behind one handle.
pub struct SharedQueue {
    store: Mutex<QueueStore>,
    /// True exactly while a dispatch pass is in flight.
    is_syncing: AtomicBool,
    sync_error: Mutex<Option<String>>,
    state_tx: watch::Sender<QueueState>,
    /// Completed passes.
    pass_count: AtomicU64,
    /// Triggers that arrived while a pass was running.
    coalesced_count: AtomicU64,
}

impl SharedQueue {
    /// Wraps `store` and publishes its current contents.
    pub fn new(store: QueueStore, sync_error: Option<String>) -> Self {
        let initial = QueueState {
            items: store.list().to_vec(),
            is_syncing: false,
            sync_error: sync_error.clone(),
        };
        let (state_tx, _) = watch::channel(initial);
        Self {
            store: Mutex::new(store),
            is_syncing: AtomicBool::new(false),
            sync_error: Mutex::new(sync_error),
            state_tx,
            pass_count: AtomicU64::new(0),
            coalesced_count: AtomicU64::new(0),
        }
    }

    /// Runs `f` against the store, then publishes the resulting state.
    ///
    /// State is published even when `f` fails so observers see any rollback.
    pub fn with_store<T>(&self, f: impl FnOnce(&mut QueueStore) -> Result<T>) -> Result<T> {
        let mut store = self.store.lock().unwrap_or_else(|e| e.into_inner());
        let before = store.revision();
        let result = f(&mut store);
        if store.revision() != before {
            self.publish_locked(&store);
        }
        result
    }

    /// Reads from the store without publishing.
    pub fn read<T>(&self, f: impl FnOnce(&QueueStore) -> T) -> T {
        let store = self.store.lock().unwrap_or_else(|e| e.into_inner());
        f(&store)
    }

    /// Returns the most recently published state.
    pub fn snapshot(&self) -> QueueState {
        self.state_tx.borrow().clone()
    }

    /// Returns a receiver that observes every published state.
    pub fn subscribe(&self) -> watch::Receiver<QueueState> {
        self.state_tx.subscribe()
    }

    pub fn is_syncing(&self) -> bool {
        self.is_syncing.load(Ordering::Acquire)
    }

    /// Claims the single dispatch slot.
    ///
    /// Returns `None` if another pass holds it; the attempt is counted as
    /// coalesced.
    pub fn try_begin_pass(&self) -> Option<PassGuard<'_>> {
        if self
            .is_syncing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            self.coalesced_count.fetch_add(1, Ordering::Relaxed);
            return None;
        }
        self.publish();
        Some(PassGuard { shared: self })
    }

    pub fn sync_error(&self) -> Option<String> {
        self.sync_error
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Replaces the queue-level error and publishes if it changed.
    pub fn set_sync_error(&self, error: Option<String>) {
        {
            let mut current = self.sync_error.lock().unwrap_or_else(|e| e.into_inner());
            if *current == error {
                return;
            }
            *current = error;
        }
        self.publish();
    }

    pub fn pass_count(&self) -> u64 {
        self.pass_count.load(Ordering::Relaxed)
    }

    pub fn coalesced_count(&self) -> u64 {
        self.coalesced_count.load(Ordering::Relaxed)
    }

    fn publish(&self) {
        let store = self.store.lock().unwrap_or_else(|e| e.into_inner());
        self.publish_locked(&store);
    }

    fn publish_locked(&self, store: &QueueStore) {
        let state = QueueState {
            items: store.list().to_vec(),
            is_syncing: self.is_syncing(),
            sync_error: self.sync_error(),
        };
        self.state_tx.send_replace(state);
    }
}

/// Releases the dispatch slot when dropped.
pub struct PassGuard<'a> {
    shared: &'a SharedQueue,
}

impl PassGuard<'_> {
    /// Records the pass as completed.
    pub fn complete(self) {
        self.shared.pass_count.fetch_add(1, Ordering::Relaxed);
    }
}

impl Drop for PassGuard<'_> {
    fn drop(&mut self) {
        self.shared.is_syncing.store(false, Ordering::Release);
        self.shared.publish();
    }
}

#[cfg(test)]
#[path = "shared_tests.rs"]
mod tests;
