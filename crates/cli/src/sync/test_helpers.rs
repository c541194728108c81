// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test helpers for sync module tests.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use serde_json::json;
use tally_core::{ManualClock, MutationId, MutationPayload, QueueState, QueuedMutation};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::{watch, Semaphore};
use tokio::task::JoinHandle;

use super::remote::{RemoteApi, ReplayError, SubmitFuture};
use super::shared::SharedQueue;
use super::store::QueueStore;

/// Fixed start time for manual clocks.
pub fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 15, 9, 30, 0).unwrap()
}

pub fn fixed_clock() -> Arc<ManualClock> {
    Arc::new(ManualClock::new(start_time()))
}

/// A `transaction.create` payload whose amount is derived from `n`.
pub fn transaction(n: u32) -> MutationPayload {
    MutationPayload::new(
        "transaction.create",
        json!({
            "account": "checking",
            "category": "groceries",
            "amount": format!("{}.00", n),
            "currency": "EUR",
            "date": "2026-01-15",
        }),
    )
    .unwrap()
}

/// A queued record with a fixed id, not backed by any store.
pub fn queued(id: &str, n: u32) -> QueuedMutation {
    QueuedMutation::new(MutationId::from(id), transaction(n), start_time())
}

/// Opens and loads a store at `dir/queue.jsonl` and wraps it.
pub fn shared_queue(dir: &Path, clock: Arc<ManualClock>) -> Arc<SharedQueue> {
    let mut store = QueueStore::with_clock(&dir.join("queue.jsonl"), clock).unwrap();
    store.load().unwrap();
    Arc::new(SharedQueue::new(store, None))
}

/// Waits up to five seconds for a published state matching `predicate`.
pub async fn wait_for<F>(rx: &mut watch::Receiver<QueueState>, predicate: F) -> QueueState
where
    F: FnMut(&QueueState) -> bool,
{
    tokio::time::timeout(Duration::from_secs(5), rx.wait_for(predicate))
        .await
        .expect("timed out waiting for queue state")
        .expect("state channel closed")
        .clone()
}

/// Polls `condition` until it holds, failing after five seconds.
pub async fn wait_until<F>(mut condition: F)
where
    F: FnMut() -> bool,
{
    tokio::time::timeout(Duration::from_secs(5), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("timed out waiting for condition");
}

/// Scripted outcome of a mock replay call.
#[derive(Debug, Clone)]
pub enum Behavior {
    Accept,
    Reject(String),
    Unreachable(String),
    /// Never resolves until [`MockRemote::release`] is called, then accepts.
    Hang,
}

type CallHook = Arc<dyn Fn(&QueuedMutation) + Send + Sync>;

struct MockState {
    default: Behavior,
    per_id: HashMap<String, Behavior>,
    calls: Vec<MutationId>,
    on_call: Option<CallHook>,
}

/// In-memory remote that records every call.
#[derive(Clone)]
pub struct MockRemote {
    state: Arc<Mutex<MockState>>,
    gate: Arc<Semaphore>,
}

impl Default for MockRemote {
    fn default() -> Self {
        Self::new(Behavior::Accept)
    }
}

impl MockRemote {
    pub fn new(default: Behavior) -> Self {
        Self {
            state: Arc::new(Mutex::new(MockState {
                default,
                per_id: HashMap::new(),
                calls: Vec::new(),
                on_call: None,
            })),
            gate: Arc::new(Semaphore::new(0)),
        }
    }

    /// Sets the outcome for every record without a per-id override.
    pub fn set_default(&self, behavior: Behavior) {
        self.state.lock().unwrap().default = behavior;
    }

    /// Sets the outcome for one record.
    pub fn set_for(&self, id: &MutationId, behavior: Behavior) {
        self.state
            .lock()
            .unwrap()
            .per_id
            .insert(id.to_string(), behavior);
    }

    /// Runs `hook` synchronously at the start of every call.
    pub fn on_call<F>(&self, hook: F)
    where
        F: Fn(&QueuedMutation) + Send + Sync + 'static,
    {
        self.state.lock().unwrap().on_call = Some(Arc::new(hook));
    }

    /// Ids passed to `submit`, in call order.
    pub fn calls(&self) -> Vec<MutationId> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn call_count(&self) -> usize {
        self.state.lock().unwrap().calls.len()
    }

    /// Lets every hanging call complete.
    pub fn release(&self) {
        self.gate.add_permits(Semaphore::MAX_PERMITS / 2);
    }
}

impl RemoteApi for MockRemote {
    fn submit<'a>(&'a self, mutation: &'a QueuedMutation) -> SubmitFuture<'a> {
        let (behavior, hook) = {
            let mut state = self.state.lock().unwrap();
            state.calls.push(mutation.id.clone());
            let behavior = state
                .per_id
                .get(mutation.id.as_str())
                .cloned()
                .unwrap_or_else(|| state.default.clone());
            (behavior, state.on_call.clone())
        };
        if let Some(hook) = hook {
            hook(mutation);
        }

        let gate = Arc::clone(&self.gate);
        Box::pin(async move {
            match behavior {
                Behavior::Accept => Ok(()),
                Behavior::Reject(msg) => Err(ReplayError::Rejected(msg)),
                Behavior::Unreachable(msg) => Err(ReplayError::Unreachable(msg)),
                Behavior::Hang => {
                    let _permit = gate.acquire().await;
                    Ok(())
                }
            }
        })
    }
}

/// Serves exactly one HTTP request with `status` and `body`.
///
/// Returns the base URL (ending in `/api`) and a handle resolving to the raw
/// request text.
pub async fn serve_once(status: u16, body: &str) -> (String, JoinHandle<String>) {
    let (url, handle) = serve_sequence(vec![(status, body.to_string())]).await;
    let handle = tokio::spawn(async move { handle.await.unwrap().remove(0) });
    (url, handle)
}

/// Serves one request per scripted response, in order, one connection each.
pub async fn serve_sequence(responses: Vec<(u16, String)>) -> (String, JoinHandle<Vec<String>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let handle = tokio::spawn(async move {
        let mut requests = Vec::new();
        for (status, body) in responses {
            let (mut socket, _) = listener.accept().await.unwrap();
            let request = read_request(&mut socket).await;
            let response = format!(
                "HTTP/1.1 {} Status\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            let _ = socket.shutdown().await;
            requests.push(request);
        }
        requests
    });

    (format!("http://{}/api", addr), handle)
}

async fn read_request(socket: &mut tokio::net::TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        let n = socket.read(&mut chunk).await.unwrap();
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(end) = header_end(&buf) {
            let headers = String::from_utf8_lossy(&buf[..end]).to_ascii_lowercase();
            let content_length = headers
                .lines()
                .find_map(|l| l.strip_prefix("content-length:"))
                .and_then(|v| v.trim().parse::<usize>().ok())
                .unwrap_or(0);
            if buf.len() >= end + 4 + content_length {
                break;
            }
        }
    }
    String::from_utf8_lossy(&buf).into_owned()
}

fn header_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4).position(|w| w == b"\r\n\r\n")
}
