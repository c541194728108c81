// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Long-running sync loop.

use std::time::Duration;

use tally_core::QueueSummary;

use super::{runtime, Context};
use crate::error::{Error, Result};
use crate::sync::{ProbeSource, ReachabilityObserver};

/// How often backoff deadlines are checked.
const RETRY_TICK: Duration = Duration::from_secs(1);

/// Syncs on startup and whenever the remote becomes reachable, until Ctrl-C.
pub fn run() -> Result<()> {
    let ctx = Context::load()?;
    let rt = runtime()?;
    rt.block_on(run_async(ctx))
}

async fn run_async(ctx: Context) -> Result<()> {
    let (host, port) = ctx.config.remote.host_port().ok_or_else(|| {
        Error::Config(format!(
            "cannot derive a host to probe from '{}'",
            ctx.config.remote.base_url
        ))
    })?;
    let engine = ctx.open_loaded_engine(Some(RETRY_TICK))?;

    let observer = ReachabilityObserver::new();
    observer.initialize(ProbeSource::new(host, port, &ctx.config.reachability));
    engine.start(&observer);
    tracing::info!(
        remote = %ctx.config.remote.base_url,
        queue = %engine.queue_path().display(),
        "watching"
    );

    let mut rx = engine.subscribe();
    let mut last = engine.summary();
    log_summary(&last);

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);
    loop {
        tokio::select! {
            result = &mut shutdown => {
                if let Err(e) = result {
                    tracing::warn!(error = %e, "failed to listen for Ctrl-C");
                }
                break;
            }
            changed = rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let summary = rx.borrow_and_update().summary(engine.policy());
                if summary != last {
                    log_summary(&summary);
                    last = summary;
                }
            }
        }
    }

    tracing::info!("shutting down");
    engine.shutdown().await;
    observer.cleanup();
    Ok(())
}

fn log_summary(summary: &QueueSummary) {
    match &summary.sync_error {
        Some(err) => tracing::error!(error = %err, "queue error"),
        None => tracing::info!(
            pending = summary.pending_count,
            failed = summary.failed_count,
            stalled = summary.stalled_count,
            syncing = summary.is_syncing,
            "queue"
        ),
    }
}
