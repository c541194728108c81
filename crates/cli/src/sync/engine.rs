// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Queue engine: the single owner of the durable queue.
//!
//! Wires the store, the dispatcher and the reachability observer together
//! and exposes the operations the rest of the application uses.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tally_core::{
    ClockSource, MutationId, MutationPayload, QueueState, QueueSummary, QueuedMutation,
    RetryPolicy, SystemClock,
};
use tokio::sync::{mpsc, watch};
use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;

use super::dispatcher::{PassOutcome, SyncDispatcher, Trigger};
use super::reachability::{ReachabilityObserver, Subscription};
use super::remote::RemoteApi;
use super::shared::SharedQueue;
use super::store::QueueStore;
use crate::error::Result;

/// Settings for [`QueueEngine::open`].
#[derive(Clone)]
pub struct EngineOptions {
    pub policy: RetryPolicy,
    pub clock: Arc<dyn ClockSource>,
    /// How often a started engine checks for elapsed backoff deadlines.
    /// `None` disables the check.
    pub retry_tick: Option<Duration>,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            policy: RetryPolicy::default(),
            clock: Arc::new(SystemClock),
            retry_tick: Some(Duration::from_secs(1)),
        }
    }
}

struct Running {
    subscription: Subscription,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

/// Owns the queue and replays it against `R`.
pub struct QueueEngine<R> {
    shared: Arc<SharedQueue>,
    dispatcher: Arc<SyncDispatcher<R>>,
    retry_tick: Option<Duration>,
    running: Mutex<Option<Running>>,
}

impl<R: RemoteApi + 'static> QueueEngine<R> {
    /// Opens and loads the queue at `queue_path`.
    ///
    /// A queue that fails to load does not fail construction: the failure is
    /// published as `sync_error` and passes refuse to run until the queue
    /// is reloaded or reset.
    ///
    /// # Errors
    ///
    /// Returns [`Error::QueueLocked`](crate::error::Error::QueueLocked) if
    /// another process owns the queue.
    pub fn open(queue_path: &Path, remote: R, options: EngineOptions) -> Result<Self> {
        let mut store = QueueStore::with_clock(queue_path, Arc::clone(&options.clock))?;
        let sync_error = match store.load() {
            Ok(items) => {
                tracing::debug!(
                    path = %queue_path.display(),
                    pending = items.len(),
                    "queue loaded"
                );
                None
            }
            Err(e) => {
                tracing::warn!(path = %queue_path.display(), error = %e, "queue failed to load");
                Some(e.to_string())
            }
        };

        let shared = Arc::new(SharedQueue::new(store, sync_error));
        let dispatcher = Arc::new(SyncDispatcher::new(
            Arc::clone(&shared),
            remote,
            options.policy,
            options.clock,
        ));

        Ok(Self {
            shared,
            dispatcher,
            retry_tick: options.retry_tick,
            running: Mutex::new(None),
        })
    }

    /// Appends a mutation. It is durable once this returns.
    pub fn enqueue(&self, payload: MutationPayload) -> Result<QueuedMutation> {
        self.shared.with_store(|store| store.enqueue(payload))
    }

    /// Removes a record without replaying it. The write is lost.
    pub fn discard(&self, id: &MutationId) -> Result<QueuedMutation> {
        let removed = self.shared.with_store(|store| store.remove(id))?;
        tracing::info!(id = %removed.id, "discarded mutation");
        Ok(removed)
    }

    /// Retries loading the queue file, e.g. after it was repaired by hand.
    pub fn reload(&self) -> Result<()> {
        match self.shared.with_store(|store| store.load().map(|_| ())) {
            Ok(()) => {
                self.shared.set_sync_error(None);
                Ok(())
            }
            Err(e) => {
                self.shared.set_sync_error(Some(e.to_string()));
                Err(e)
            }
        }
    }

    /// Moves an unreadable queue file aside and starts empty.
    pub fn reset_storage(&self) -> Result<Option<PathBuf>> {
        let moved = self.shared.with_store(|store| store.reset())?;
        self.shared.set_sync_error(None);
        Ok(moved)
    }

    pub fn queue_path(&self) -> PathBuf {
        self.shared.read(|store| store.path().to_path_buf())
    }

    /// Returns the current state snapshot.
    pub fn state(&self) -> QueueState {
        self.shared.snapshot()
    }

    pub fn summary(&self) -> QueueSummary {
        self.state().summary(self.dispatcher.policy())
    }

    pub fn policy(&self) -> &RetryPolicy {
        self.dispatcher.policy()
    }

    /// Returns a receiver notified on every state change.
    pub fn subscribe(&self) -> watch::Receiver<QueueState> {
        self.shared.subscribe()
    }

    /// Runs a manual pass. Manual passes ignore backoff and the stall
    /// ceiling.
    pub async fn process_queue(&self) -> Result<PassOutcome> {
        self.dispatcher.process_queue(Trigger::Manual).await
    }

    /// Completed passes since the engine was opened.
    pub fn pass_count(&self) -> u64 {
        self.shared.pass_count()
    }

    /// Triggers dropped because a pass was already running.
    pub fn coalesced_count(&self) -> u64 {
        self.shared.coalesced_count()
    }

    pub fn is_started(&self) -> bool {
        self.running
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .is_some()
    }

    /// Starts automatic syncing.
    ///
    /// Fires a startup pass, then a pass on every transition into usable
    /// connectivity and whenever a backoff deadline elapses. The observer
    /// also gates each record of a pass. Must be called from within a tokio
    /// runtime; does nothing if already started.
    pub fn start(&self, observer: &ReachabilityObserver) {
        let mut running = self.running.lock().unwrap_or_else(|e| e.into_inner());
        if running.is_some() {
            return;
        }

        let (tx, rx) = mpsc::unbounded_channel();
        let trigger_tx = tx.clone();
        let subscription = observer.subscribe(move |snapshot| {
            if snapshot.is_usable() {
                let _ = trigger_tx.send(Trigger::Reachability);
            }
        });
        self.dispatcher.set_gate(Some(observer.clone()));
        let _ = tx.send(Trigger::Startup);

        let cancel = CancellationToken::new();
        let task = tokio::spawn(trigger_loop(
            Arc::clone(&self.dispatcher),
            rx,
            cancel.clone(),
            self.retry_tick,
        ));

        tracing::info!("queue engine started");
        *running = Some(Running {
            subscription,
            cancel,
            task,
        });
    }

    /// Stops automatic syncing and waits for any in-flight pass to finish.
    ///
    /// Idempotent.
    pub async fn shutdown(&self) {
        let running = self
            .running
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        let Some(running) = running else {
            return;
        };

        running.subscription.unsubscribe();
        running.cancel.cancel();
        if let Err(e) = running.task.await {
            tracing::warn!(error = %e, "trigger task ended abnormally");
        }
        self.dispatcher.set_gate(None);
        tracing::info!("queue engine stopped");
    }
}

/// Serves triggers until cancelled. Each pass runs on its own task so the
/// loop keeps receiving; triggers that land mid-pass coalesce.
async fn trigger_loop<R: RemoteApi + 'static>(
    dispatcher: Arc<SyncDispatcher<R>>,
    mut rx: mpsc::UnboundedReceiver<Trigger>,
    cancel: CancellationToken,
    retry_tick: Option<Duration>,
) {
    let mut passes = JoinSet::new();
    let mut ticker = retry_tick.map(|period| {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        interval
    });

    loop {
        let trigger = tokio::select! {
            _ = cancel.cancelled() => break,
            trigger = rx.recv() => match trigger {
                Some(trigger) => trigger,
                None => break,
            },
            _ = tick(&mut ticker) => {
                if !dispatcher.has_due_retries() {
                    continue;
                }
                Trigger::Retry
            }
            Some(_) = passes.join_next(), if !passes.is_empty() => continue,
        };

        let dispatcher = Arc::clone(&dispatcher);
        passes.spawn(async move {
            if let Err(e) = dispatcher.process_queue(trigger).await {
                tracing::warn!(%trigger, error = %e, "automatic pass failed");
            }
        });
    }

    // No mid-record cancellation: let in-flight passes resolve.
    while passes.join_next().await.is_some() {}
}

async fn tick(ticker: &mut Option<tokio::time::Interval>) {
    match ticker {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}

#[cfg(test)]
#[path = "engine_tests.rs"]
mod tests;
