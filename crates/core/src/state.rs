// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! UI-facing queue state and its derived summary.
//!
//! [`QueueState`] is what the engine publishes after every change;
//! [`QueueSummary`] is a pure projection of it for badges and status lines.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::mutation::QueuedMutation;
use crate::retry::RetryPolicy;

/// Live queue contents plus dispatcher status. Never persisted.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QueueState {
    /// Pending records in FIFO order.
    pub items: Vec<QueuedMutation>,
    /// True exactly while a dispatch pass is in flight.
    pub is_syncing: bool,
    /// Queue-level failure that prevented a pass (e.g. unreadable storage).
    pub sync_error: Option<String>,
}

/// Counters derived from a [`QueueState`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct QueueSummary {
    pub pending_count: usize,
    pub failed_count: usize,
    /// Records automatic passes no longer replay.
    pub stalled_count: usize,
    pub is_syncing: bool,
    pub sync_error: Option<String>,
    pub oldest_created_at: Option<DateTime<Utc>>,
}

impl QueueState {
    /// Derives the summary counters under `policy`.
    pub fn summary(&self, policy: &RetryPolicy) -> QueueSummary {
        QueueSummary {
            pending_count: self.items.len(),
            failed_count: self.items.iter().filter(|m| m.has_failed()).count(),
            stalled_count: self.items.iter().filter(|m| policy.is_stalled(m.retry_count)).count(),
            is_syncing: self.is_syncing,
            sync_error: self.sync_error.clone(),
            oldest_created_at: self.items.iter().map(|m| m.created_at).min(),
        }
    }
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
