// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Network reachability observer.
//!
//! Turns platform connectivity events into a de-duplicated stream of
//! [`ReachabilitySnapshot`] transitions. Events arrive either through
//! [`ReachabilityObserver::report`] (callback-style platforms, tests) or
//! from a [`ConnectivitySource`] pumped by a background task.

use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use tally_core::ReachabilitySnapshot;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::config::ReachabilityConfig;

/// Callback invoked on every reachability transition.
pub type ReachabilityCallback = dyn Fn(&ReachabilitySnapshot) + Send + Sync;

/// A stream of platform connectivity snapshots.
pub trait ConnectivitySource: Send {
    /// Waits for the next snapshot. `None` ends the stream.
    fn next(&mut self) -> Pin<Box<dyn Future<Output = Option<ReachabilitySnapshot>> + Send + '_>>;
}

struct Inner {
    last: Mutex<Option<ReachabilitySnapshot>>,
    subscribers: Mutex<BTreeMap<u64, Arc<ReachabilityCallback>>>,
    next_id: AtomicU64,
    pump: Mutex<Option<(JoinHandle<()>, CancellationToken)>>,
}

/// Process-wide connectivity state with a subscriber list.
///
/// Cheap to clone; all clones share state.
#[derive(Clone)]
pub struct ReachabilityObserver {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for ReachabilityObserver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReachabilityObserver")
            .field("current", &self.current())
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

impl Default for ReachabilityObserver {
    fn default() -> Self {
        Self::new()
    }
}

impl ReachabilityObserver {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                last: Mutex::new(None),
                subscribers: Mutex::new(BTreeMap::new()),
                next_id: AtomicU64::new(1),
                pump: Mutex::new(None),
            }),
        }
    }

    /// Starts pumping `source` on a background task.
    ///
    /// Does nothing if a pump is already running. Must be called from
    /// within a tokio runtime.
    pub fn initialize<S>(&self, source: S)
    where
        S: ConnectivitySource + 'static,
    {
        let mut pump = self.inner.pump.lock().unwrap_or_else(|e| e.into_inner());
        if pump.as_ref().is_some_and(|(handle, _)| !handle.is_finished()) {
            return;
        }

        let cancel = CancellationToken::new();
        let observer = self.clone();
        let token = cancel.clone();
        let handle = tokio::spawn(async move {
            let mut source = source;
            loop {
                let next = tokio::select! {
                    _ = token.cancelled() => return,
                    next = source.next() => next,
                };
                match next {
                    Some(snapshot) => {
                        observer.report(snapshot);
                    }
                    None => {
                        tracing::debug!("connectivity source ended");
                        return;
                    }
                }
            }
        });
        *pump = Some((handle, cancel));
    }

    /// Feeds one platform snapshot.
    ///
    /// Returns true if it was a transition and subscribers were notified;
    /// an identical repeat of the previous snapshot is dropped.
    pub fn report(&self, snapshot: ReachabilitySnapshot) -> bool {
        {
            let mut last = self.inner.last.lock().unwrap_or_else(|e| e.into_inner());
            if *last == Some(snapshot) {
                return false;
            }
            *last = Some(snapshot);
        }

        tracing::info!(%snapshot, usable = snapshot.is_usable(), "reachability changed");

        // Invoke outside the lock so callbacks may subscribe or unsubscribe.
        let callbacks: Vec<_> = self
            .inner
            .subscribers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .values()
            .cloned()
            .collect();
        for callback in callbacks {
            callback(&snapshot);
        }
        true
    }

    /// Registers `callback` for every subsequent transition.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&ReachabilitySnapshot) + Send + Sync + 'static,
    {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        self.inner
            .subscribers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(id, Arc::new(callback));
        Subscription {
            id,
            inner: Arc::downgrade(&self.inner),
        }
    }

    /// Returns the latest snapshot, if any has been reported.
    pub fn current(&self) -> Option<ReachabilitySnapshot> {
        *self.inner.last.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Returns true unless the latest snapshot says connectivity is unusable.
    ///
    /// Before the first report nothing is known, which counts as usable.
    pub fn is_usable(&self) -> bool {
        self.current().is_none_or(|s| s.is_usable())
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner
            .subscribers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }

    /// Stops the pump and drops every subscriber.
    pub fn cleanup(&self) {
        let pump = self
            .inner
            .pump
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if let Some((handle, cancel)) = pump {
            cancel.cancel();
            handle.abort();
        }
        self.inner
            .subscribers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }
}

/// Handle returned by [`ReachabilityObserver::subscribe`].
///
/// Dropping the handle unsubscribes.
#[derive(Debug)]
pub struct Subscription {
    id: u64,
    inner: Weak<Inner>,
}

impl Subscription {
    pub fn unsubscribe(self) {
        // Drop does the work.
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(inner) = self.inner.upgrade() {
            inner
                .subscribers
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .remove(&self.id);
        }
    }
}

/// Source fed from an mpsc channel.
pub struct ChannelSource {
    rx: mpsc::Receiver<ReachabilitySnapshot>,
}

impl ChannelSource {
    /// Returns the sender half and the source.
    pub fn new(buffer: usize) -> (mpsc::Sender<ReachabilitySnapshot>, Self) {
        let (tx, rx) = mpsc::channel(buffer);
        (tx, Self { rx })
    }
}

impl ConnectivitySource for ChannelSource {
    fn next(&mut self) -> Pin<Box<dyn Future<Output = Option<ReachabilitySnapshot>> + Send + '_>> {
        Box::pin(self.rx.recv())
    }
}

/// Source that periodically resolves and connects to the remote host.
pub struct ProbeSource {
    host: String,
    port: u16,
    interval: Duration,
    timeout: Duration,
    first: bool,
}

impl ProbeSource {
    pub fn new(host: impl Into<String>, port: u16, config: &ReachabilityConfig) -> Self {
        Self {
            host: host.into(),
            port,
            interval: Duration::from_millis(config.probe_interval_ms),
            timeout: Duration::from_millis(config.probe_timeout_ms),
            first: true,
        }
    }

    /// Runs a single probe.
    pub async fn probe(&self) -> ReachabilitySnapshot {
        let lookup = tokio::time::timeout(
            self.timeout,
            tokio::net::lookup_host((self.host.as_str(), self.port)),
        )
        .await;

        let addrs: Vec<_> = match lookup {
            Ok(Ok(addrs)) => addrs.collect(),
            Ok(Err(e)) => {
                tracing::debug!(host = %self.host, error = %e, "probe: resolve failed");
                return ReachabilitySnapshot::offline();
            }
            Err(_) => {
                tracing::debug!(host = %self.host, "probe: resolve timed out");
                return ReachabilitySnapshot::new(true, None);
            }
        };

        for addr in &addrs {
            if let Ok(Ok(_)) = tokio::time::timeout(self.timeout, TcpStream::connect(*addr)).await {
                return ReachabilitySnapshot::online();
            }
        }

        tracing::debug!(host = %self.host, port = self.port, "probe: connect failed");
        ReachabilitySnapshot::new(true, Some(false))
    }
}

impl ConnectivitySource for ProbeSource {
    fn next(&mut self) -> Pin<Box<dyn Future<Output = Option<ReachabilitySnapshot>> + Send + '_>> {
        Box::pin(async move {
            if self.first {
                self.first = false;
            } else {
                tokio::time::sleep(self.interval).await;
            }
            Some(self.probe().await)
        })
    }
}

#[cfg(test)]
#[path = "reachability_tests.rs"]
mod tests;
