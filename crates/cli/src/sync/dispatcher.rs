// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Sync dispatcher: drains the queue against the remote.
//!
//! A pass replays records strictly in FIFO order, one call at a time. Only
//! one pass runs at a time; a trigger that arrives mid-pass is coalesced.

use std::sync::{Arc, Mutex};

use tally_core::{ClockSource, MutationPatch, QueuedMutation, RetryPolicy};

use super::reachability::ReachabilityObserver;
use super::remote::RemoteApi;
use super::shared::SharedQueue;
use crate::error::{Error, Result};

/// What started a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    Startup,
    Reachability,
    /// A failed record's backoff deadline elapsed.
    Retry,
    Manual,
}

impl Trigger {
    /// Automatic passes honour backoff and the stall ceiling.
    pub fn is_automatic(self) -> bool {
        !matches!(self, Trigger::Manual)
    }
}

impl std::fmt::Display for Trigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Trigger::Startup => write!(f, "startup"),
            Trigger::Reachability => write!(f, "reachability"),
            Trigger::Retry => write!(f, "retry"),
            Trigger::Manual => write!(f, "manual"),
        }
    }
}

/// Counters for one completed pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PassReport {
    pub trigger: Trigger,
    /// Replay calls issued.
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Records passed over for backoff or stall.
    pub skipped: usize,
    /// True if the pass stopped early and left records untouched.
    pub aborted: bool,
}

impl PassReport {
    fn new(trigger: Trigger) -> Self {
        Self {
            trigger,
            attempted: 0,
            succeeded: 0,
            failed: 0,
            skipped: 0,
            aborted: false,
        }
    }
}

/// Result of [`SyncDispatcher::process_queue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassOutcome {
    Completed(PassReport),
    /// Another pass was already running; nothing was done.
    Coalesced,
}

impl PassOutcome {
    pub fn report(&self) -> Option<&PassReport> {
        match self {
            PassOutcome::Completed(report) => Some(report),
            PassOutcome::Coalesced => None,
        }
    }
}

/// Replays queued mutations against a [`RemoteApi`].
pub struct SyncDispatcher<R> {
    shared: Arc<SharedQueue>,
    remote: R,
    policy: RetryPolicy,
    clock: Arc<dyn ClockSource>,
    /// Consulted before each record when set.
    gate: Mutex<Option<ReachabilityObserver>>,
}

impl<R: RemoteApi> SyncDispatcher<R> {
    pub fn new(
        shared: Arc<SharedQueue>,
        remote: R,
        policy: RetryPolicy,
        clock: Arc<dyn ClockSource>,
    ) -> Self {
        Self {
            shared,
            remote,
            policy,
            clock,
            gate: Mutex::new(None),
        }
    }

    /// Wires the reachability gate consulted between records.
    pub fn set_gate(&self, observer: Option<ReachabilityObserver>) {
        *self.gate.lock().unwrap_or_else(|e| e.into_inner()) = observer;
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Returns true if a failed record's backoff has elapsed and an
    /// automatic pass would replay it.
    pub fn has_due_retries(&self) -> bool {
        let now = self.clock.now();
        self.shared.read(|store| {
            store.list().iter().any(|m| {
                m.next_attempt_at.is_some()
                    && m.is_due(now)
                    && !self.policy.is_stalled(m.retry_count)
            })
        })
    }

    fn connectivity_lost(&self) -> bool {
        self.gate
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
            .is_some_and(|observer| !observer.is_usable())
    }

    /// Runs one pass over the records present when the pass starts.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Storage`] if the queue cannot be read or written.
    /// The error is also published as the queue's `sync_error`.
    pub async fn process_queue(&self, trigger: Trigger) -> Result<PassOutcome> {
        let Some(guard) = self.shared.try_begin_pass() else {
            tracing::debug!(%trigger, "pass already running, coalesced");
            return Ok(PassOutcome::Coalesced);
        };

        match self.run_pass(trigger).await {
            Ok(report) => {
                self.shared.set_sync_error(None);
                guard.complete();
                log_report(&report);
                Ok(PassOutcome::Completed(report))
            }
            Err(e) => {
                tracing::warn!(%trigger, error = %e, "pass failed");
                self.shared.set_sync_error(Some(e.to_string()));
                Err(e)
            }
        }
    }

    async fn run_pass(&self, trigger: Trigger) -> Result<PassReport> {
        let items = self.shared.with_store(|store| {
            store.ensure_loaded()?;
            Ok(store.list().to_vec())
        })?;

        tracing::info!(%trigger, pending = items.len(), "pass started");
        let mut report = PassReport::new(trigger);

        for mutation in items {
            if self.connectivity_lost() {
                tracing::info!(%trigger, "connectivity lost, leaving remaining records");
                report.aborted = true;
                break;
            }

            if trigger.is_automatic() && self.should_skip(&mutation) {
                report.skipped += 1;
                continue;
            }

            report.attempted += 1;
            match self.remote.submit(&mutation).await {
                Ok(()) => {
                    report.succeeded += 1;
                    self.record_success(&mutation)?;
                }
                Err(err) => {
                    report.failed += 1;
                    self.record_failure(&mutation, err.message())?;
                    if err.aborts_pass() {
                        tracing::warn!(
                            id = %mutation.id,
                            error = %err,
                            "remote unreachable, aborting pass"
                        );
                        report.aborted = true;
                        break;
                    }
                    tracing::warn!(id = %mutation.id, error = %err, "replay rejected");
                }
            }
        }

        Ok(report)
    }

    fn should_skip(&self, mutation: &QueuedMutation) -> bool {
        if self.policy.is_stalled(mutation.retry_count) {
            tracing::debug!(id = %mutation.id, retries = mutation.retry_count, "stalled, skipping");
            return true;
        }
        if !mutation.is_due(self.clock.now()) {
            tracing::debug!(id = %mutation.id, "backing off, skipping");
            return true;
        }
        false
    }

    fn record_success(&self, mutation: &QueuedMutation) -> Result<()> {
        match self.shared.with_store(|store| store.remove(&mutation.id)) {
            Ok(_) => Ok(()),
            // Discarded by the user while in flight.
            Err(Error::MutationNotFound(_)) => Ok(()),
            Err(e) => Err(e),
        }
    }

    fn record_failure(&self, mutation: &QueuedMutation, message: &str) -> Result<()> {
        let retry_count = mutation.retry_count.saturating_add(1);
        let patch = MutationPatch::failure(message)
            .retry_at(self.policy.next_attempt_at(self.clock.now(), retry_count));
        match self.shared.with_store(|store| store.update(&mutation.id, &patch)) {
            Ok(updated) => {
                if self.policy.is_stalled(updated.retry_count) {
                    tracing::warn!(
                        id = %updated.id,
                        retries = updated.retry_count,
                        "record stalled"
                    );
                }
                Ok(())
            }
            Err(Error::MutationNotFound(_)) => Ok(()),
            Err(e) => Err(e),
        }
    }
}

fn log_report(report: &PassReport) {
    tracing::info!(
        trigger = %report.trigger,
        attempted = report.attempted,
        succeeded = report.succeeded,
        failed = report.failed,
        skipped = report.skipped,
        aborted = report.aborted,
        "pass finished"
    );
}

#[cfg(test)]
#[path = "dispatcher_tests.rs"]
mod tests;
