// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Queued mutations: the unit of durability and retry.
//!
//! A [`QueuedMutation`] wraps an opaque [`MutationPayload`] (a kind tag and a
//! JSON body) with the bookkeeping the dispatcher needs. The payload is never
//! interpreted by the engine; it is replayed verbatim against the remote.
//!
//! Records are persisted as JSON. Unknown fields are ignored and every field
//! added after the first release is optional, so older readers keep working
//! after an upgrade writes a newer record.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{Error, Result};

const ID_PREFIX: &str = "mut";

/// Disambiguates ids generated within the same clock tick.
static ID_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Opaque identifier for a queued mutation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MutationId(String);

impl MutationId {
    /// Wraps an existing identifier string.
    pub fn new(id: impl Into<String>) -> Self {
        MutationId(id.into())
    }

    /// Generates a fresh id for `payload` enqueued at `created_at`.
    ///
    /// Format: `mut-{hash}` where hash is the first 12 hex chars of
    /// SHA256(kind + body + timestamp + counter). `exists` is consulted so a
    /// collision gets an incrementing suffix instead of a duplicate.
    pub fn generate<F>(payload: &MutationPayload, created_at: &DateTime<Utc>, exists: F) -> Self
    where
        F: Fn(&str) -> bool,
    {
        let counter = ID_COUNTER.fetch_add(1, Ordering::Relaxed);
        let input = format!(
            "{}{}{}{}",
            payload.kind,
            payload.body,
            created_at.to_rfc3339_opts(chrono::SecondsFormat::Nanos, true),
            counter
        );
        let hash = Sha256::digest(input.as_bytes());
        let base = format!("{}-{}", ID_PREFIX, hex::encode(&hash[..6]));

        if !exists(&base) {
            return MutationId(base);
        }

        let mut suffix = 2;
        loop {
            let id = format!("{}-{}", base, suffix);
            if !exists(&id) {
                return MutationId(id);
            }
            suffix += 1;
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MutationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MutationId {
    fn from(s: &str) -> Self {
        MutationId(s.to_string())
    }
}

/// The domain write carried by a mutation.
///
/// `kind` selects the remote endpoint (e.g. `transaction.create`); `body` is
/// sent as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MutationPayload {
    pub kind: String,
    pub body: serde_json::Value,
}

impl MutationPayload {
    /// Creates a payload, validating the kind tag.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidKind`] unless `kind` is one or more non-empty
    /// segments of `[a-z0-9_]` joined by dots.
    pub fn new(kind: impl Into<String>, body: serde_json::Value) -> Result<Self> {
        let kind = kind.into();
        if !validate_kind(&kind) {
            return Err(Error::InvalidKind(kind));
        }
        Ok(MutationPayload { kind, body })
    }
}

/// Validates a dotted kind tag.
pub fn validate_kind(kind: &str) -> bool {
    !kind.is_empty()
        && kind.split('.').all(|segment| {
            !segment.is_empty()
                && segment
                    .chars()
                    .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
        })
}

/// A pending write waiting to be replayed against the remote.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueuedMutation {
    pub id: MutationId,
    pub payload: MutationPayload,
    pub created_at: DateTime<Utc>,
    /// Replay attempts that failed so far. Never decreases.
    #[serde(default)]
    pub retry_count: u32,
    /// Most recent failure message. Cleared only by a successful replay,
    /// which also removes the record.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    /// Earliest time an automatic pass should replay this record again.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_attempt_at: Option<DateTime<Utc>>,
}

impl QueuedMutation {
    /// Creates a fresh, never-attempted record.
    pub fn new(id: MutationId, payload: MutationPayload, created_at: DateTime<Utc>) -> Self {
        QueuedMutation {
            id,
            payload,
            created_at,
            retry_count: 0,
            last_error: None,
            next_attempt_at: None,
        }
    }

    /// Applies a patch in place.
    pub fn apply(&mut self, patch: &MutationPatch) {
        if patch.increment_retry {
            self.retry_count = self.retry_count.saturating_add(1);
        }
        if let Some(error) = &patch.last_error {
            self.last_error = Some(error.clone());
        }
        if let Some(at) = patch.next_attempt_at {
            self.next_attempt_at = Some(at);
        }
    }

    /// Returns true if the most recent replay of this record failed.
    pub fn has_failed(&self) -> bool {
        self.last_error.is_some()
    }

    /// Returns true if the backoff deadline (if any) has passed.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.next_attempt_at.is_none_or(|at| at <= now)
    }
}

/// Changes the dispatcher may make to an existing record.
///
/// A patch can only add information: it may bump the retry count and replace
/// the error message, but it can never reset either.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MutationPatch {
    pub increment_retry: bool,
    pub last_error: Option<String>,
    pub next_attempt_at: Option<DateTime<Utc>>,
}

impl MutationPatch {
    /// A failed attempt: bump the retry count and record the cause.
    pub fn failure(message: impl Into<String>) -> Self {
        MutationPatch {
            increment_retry: true,
            last_error: Some(message.into()),
            next_attempt_at: None,
        }
    }

    /// Sets the backoff deadline carried by this patch.
    pub fn retry_at(mut self, at: DateTime<Utc>) -> Self {
        self.next_attempt_at = Some(at);
        self
    }
}

#[cfg(test)]
#[path = "mutation_tests.rs"]
mod tests;
