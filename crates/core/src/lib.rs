// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! tally-core: Shared types for the tally offline mutation queue
//!
//! This crate provides the data model, persistence format, retry policy and
//! state projection used by the `tally` engine. It performs no network I/O.

pub mod clock;
pub mod error;
pub mod jsonl;
pub mod mutation;
pub mod reachability;
pub mod retry;
pub mod state;

pub use clock::{ClockSource, ManualClock, SystemClock};
pub use error::{Error, Result};
pub use mutation::{MutationId, MutationPatch, MutationPayload, QueuedMutation};
pub use reachability::ReachabilitySnapshot;
pub use retry::RetryPolicy;
pub use state::{QueueState, QueueSummary};
