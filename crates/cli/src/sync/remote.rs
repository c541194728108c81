// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Remote API abstraction for replaying mutations.
//!
//! Provides a trait-based seam so the dispatcher can run against:
//! - [`HttpRemote`], which POSTs each mutation as JSON
//! - mock remotes in unit tests

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use reqwest::StatusCode;
use tally_core::QueuedMutation;

use crate::config::RemoteConfig;
use crate::error::{Error, Result};

/// Why a replay attempt did not succeed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReplayError {
    /// The remote answered and refused this record. Other records may
    /// still succeed.
    #[error("{0}")]
    Rejected(String),

    /// The remote could not be reached. The rest of the pass is pointless.
    #[error("{0}")]
    Unreachable(String),
}

impl ReplayError {
    /// Returns true if the remaining records of a pass should be left alone.
    pub fn aborts_pass(&self) -> bool {
        matches!(self, ReplayError::Unreachable(_))
    }

    pub fn message(&self) -> &str {
        match self {
            ReplayError::Rejected(msg) | ReplayError::Unreachable(msg) => msg,
        }
    }
}

/// Future returned by [`RemoteApi::submit`].
pub type SubmitFuture<'a> =
    Pin<Box<dyn Future<Output = std::result::Result<(), ReplayError>> + Send + 'a>>;

/// Replays one mutation against the remote.
///
/// Implementations must resolve every call; the dispatcher waits for each
/// record before moving on.
pub trait RemoteApi: Send + Sync {
    fn submit<'a>(&'a self, mutation: &'a QueuedMutation) -> SubmitFuture<'a>;
}

impl<R: RemoteApi + ?Sized> RemoteApi for Arc<R> {
    fn submit<'a>(&'a self, mutation: &'a QueuedMutation) -> SubmitFuture<'a> {
        (**self).submit(mutation)
    }
}

/// HTTP remote backed by reqwest.
#[derive(Debug, Clone)]
pub struct HttpRemote {
    client: reqwest::Client,
    config: RemoteConfig,
}

impl HttpRemote {
    pub fn new(config: RemoteConfig) -> Result<Self> {
        if let Some(msg) = config.validate_url() {
            return Err(Error::Config(msg));
        }
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("tally/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::Remote(e.to_string()))?;
        Ok(Self { client, config })
    }

    async fn post(&self, mutation: &QueuedMutation) -> std::result::Result<(), ReplayError> {
        let url = self.config.url_for(&mutation.payload.kind);
        let mut request = self
            .client
            .post(&url)
            .header("Idempotency-Key", mutation.id.as_str())
            .json(&mutation.payload.body);
        if let Some(token) = &self.config.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(classify_transport)?;
        let status = response.status();
        if status.is_success() {
            tracing::debug!(id = %mutation.id, %status, "remote accepted");
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        let message = error_message(status, &body);
        Err(classify_status(status, message))
    }
}

impl RemoteApi for HttpRemote {
    fn submit<'a>(&'a self, mutation: &'a QueuedMutation) -> SubmitFuture<'a> {
        Box::pin(self.post(mutation))
    }
}

/// Gateway errors mean the remote itself is out of reach.
pub(crate) fn classify_status(status: StatusCode, message: String) -> ReplayError {
    match status {
        StatusCode::BAD_GATEWAY | StatusCode::SERVICE_UNAVAILABLE | StatusCode::GATEWAY_TIMEOUT => {
            ReplayError::Unreachable(message)
        }
        _ => ReplayError::Rejected(message),
    }
}

/// Extracts `message` or `error` from a JSON error body, else the status line.
pub(crate) fn error_message(status: StatusCode, body: &str) -> String {
    let status_line = match status.canonical_reason() {
        Some(reason) => format!("HTTP {} {}", status.as_u16(), reason),
        None => format!("HTTP {}", status.as_u16()),
    };

    let detail = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            ["message", "error"]
                .iter()
                .find_map(|key| v.get(key).and_then(|m| m.as_str()).map(str::to_string))
        })
        .filter(|m| !m.trim().is_empty());

    match detail {
        Some(detail) => format!("{}: {}", status_line, detail),
        None => status_line,
    }
}

fn classify_transport(e: reqwest::Error) -> ReplayError {
    if e.is_connect() || e.is_timeout() {
        ReplayError::Unreachable(e.to_string())
    } else {
        ReplayError::Rejected(e.to_string())
    }
}

#[cfg(test)]
#[path = "remote_tests.rs"]
mod tests;
