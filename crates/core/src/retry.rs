// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Retry policy for failed replays.
//!
//! A record that fails is not retried again by automatic passes until its
//! backoff delay has elapsed. The delay doubles with every failure, capped at
//! `max_delay_secs`. Once `retry_count` reaches `max_retries` the record is
//! stalled: automatic passes leave it alone and only a manual retry replays
//! it. Stalled records are never dropped.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Exponential backoff with an optional stall ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Delay after the first failure (milliseconds).
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,
    /// Upper bound on the delay (seconds).
    #[serde(default = "default_max_delay_secs")]
    pub max_delay_secs: u64,
    /// Failures after which automatic passes stop replaying (0 = unlimited).
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

fn default_initial_delay_ms() -> u64 {
    1_000
}

fn default_max_delay_secs() -> u64 {
    300
}

fn default_max_retries() -> u32 {
    8
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            initial_delay_ms: default_initial_delay_ms(),
            max_delay_secs: default_max_delay_secs(),
            max_retries: default_max_retries(),
        }
    }
}

impl RetryPolicy {
    /// A policy that retries immediately and never stalls.
    pub fn immediate() -> Self {
        RetryPolicy {
            initial_delay_ms: 0,
            max_delay_secs: 0,
            max_retries: 0,
        }
    }

    /// Backoff delay after the `retry_count`-th failure.
    pub fn delay_for(&self, retry_count: u32) -> Duration {
        if retry_count == 0 || self.initial_delay_ms == 0 {
            return Duration::zero();
        }
        let shift = (retry_count - 1).min(32);
        let delay_ms = self.initial_delay_ms.saturating_mul(1u64 << shift);
        let cap_ms = self.max_delay_secs.saturating_mul(1000);
        let delay_ms = std::cmp::min(delay_ms, cap_ms);
        Duration::milliseconds(i64::try_from(delay_ms).unwrap_or(i64::MAX))
    }

    /// When a record that has now failed `retry_count` times becomes due.
    pub fn next_attempt_at(&self, now: DateTime<Utc>, retry_count: u32) -> DateTime<Utc> {
        now.checked_add_signed(self.delay_for(retry_count)).unwrap_or(now)
    }

    /// Returns true if automatic passes should stop replaying the record.
    pub fn is_stalled(&self, retry_count: u32) -> bool {
        self.max_retries > 0 && retry_count >= self.max_retries
    }
}

#[cfg(test)]
#[path = "retry_tests.rs"]
mod tests;
