// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

pub mod add;
pub mod discard;
pub mod enqueue;
pub mod init;
pub mod list;
pub mod reset;
pub mod status;
pub mod sync;
pub mod watch;

use std::path::PathBuf;
use std::time::Duration;

use tally_core::{QueuedMutation, RetryPolicy};

use crate::config::{self, Config};
use crate::error::{Error, Result};
use crate::sync::{EngineOptions, HttpRemote, QueueEngine};

/// Data directory and configuration for one command invocation.
#[derive(Debug, Clone)]
pub struct Context {
    pub data_dir: PathBuf,
    pub config: Config,
}

impl Context {
    /// Resolves the data directory and loads its configuration.
    pub fn load() -> Result<Self> {
        let data_dir = config::data_dir();
        let config = Config::load(&data_dir)?.with_env_overrides()?;
        Ok(Self { data_dir, config })
    }

    pub fn queue_path(&self) -> PathBuf {
        config::queue_path(&self.data_dir)
    }

    /// Opens the engine and fails if the queue could not be read.
    pub fn open_loaded_engine(
        &self,
        retry_tick: Option<Duration>,
    ) -> Result<QueueEngine<HttpRemote>> {
        let engine = self.open_engine(retry_tick)?;
        if let Some(err) = engine.state().sync_error {
            return Err(Error::QueueUnreadable(err));
        }
        Ok(engine)
    }

    /// Opens the queue engine against the configured remote.
    ///
    /// `retry_tick` is only needed by long-running commands.
    pub fn open_engine(&self, retry_tick: Option<Duration>) -> Result<QueueEngine<HttpRemote>> {
        let remote = HttpRemote::new(self.config.remote.clone())?;
        QueueEngine::open(
            &self.queue_path(),
            remote,
            EngineOptions {
                policy: self.config.retry,
                retry_tick,
                ..EngineOptions::default()
            },
        )
    }
}

/// Builds a multi-threaded tokio runtime for async commands.
pub fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Runtime::new()
        .map_err(|e| Error::Io(std::io::Error::other(format!("tokio: {}", e))))
}

/// One-word state of a record under `policy`.
pub fn record_status(mutation: &QueuedMutation, policy: &RetryPolicy) -> &'static str {
    if policy.is_stalled(mutation.retry_count) {
        "stalled"
    } else if mutation.has_failed() {
        "failed"
    } else {
        "pending"
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
pub mod testing;
