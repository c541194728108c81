// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Offline mutation queue and sync engine.
//!
//! Writes are appended to a durable queue first and replayed against the
//! remote API later, when connectivity allows.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │   Engine    │────►│ Dispatcher  │────►│  RemoteApi  │
//! │(QueueEngine)│     │   (pass)    │     │   (trait)   │
//! └─────────────┘     └─────────────┘     └─────────────┘
//!        │                   ▲  │
//!        ▼                   │  ▼
//! ┌─────────────┐     ┌─────────────┐
//! │ Reachability│     │ SharedQueue │──► watch::Receiver<QueueState>
//! │  Observer   │     │ (QueueStore)│
//! └─────────────┘     └─────────────┘
//! ```
//!
//! # Features
//!
//! - JSONL queue file rewritten atomically on every change
//! - FIFO replay, one record at a time, single pass in flight
//! - Exponential backoff and a stall ceiling for automatic passes
//! - De-duplicated reachability transitions with a TCP probe source
//! - Injectable remote trait for testing

mod dispatcher;
mod engine;
mod reachability;
mod remote;
mod shared;
mod store;

pub use dispatcher::{PassOutcome, PassReport, SyncDispatcher, Trigger};
pub use engine::{EngineOptions, QueueEngine};
pub use reachability::{
    ChannelSource, ConnectivitySource, ProbeSource, ReachabilityObserver, Subscription,
};
pub use remote::{HttpRemote, RemoteApi, ReplayError, SubmitFuture};
pub use shared::SharedQueue;
pub use store::{is_owned, read_snapshot, QueueStore};

#[cfg(test)]
pub(crate) mod test_helpers;
