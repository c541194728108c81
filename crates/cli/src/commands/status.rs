// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use std::io::Write;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tally_core::{QueueState, RetryPolicy};

use super::Context;
use crate::cli::ReportFormat;
use crate::error::Result;
use crate::sync::{is_owned, read_snapshot};

/// JSON representation of the queue status.
#[derive(Debug, Serialize)]
pub(crate) struct StatusJson {
    pub data_dir: String,
    pub remote: String,
    pub pending_count: usize,
    pub failed_count: usize,
    pub stalled_count: usize,
    pub oldest_created_at: Option<DateTime<Utc>>,
    pub sync_error: Option<String>,
    pub watcher_running: bool,
}

/// Shows queue and sync status.
///
/// Never fails on an unreadable queue; the failure is reported instead.
pub fn run(output: ReportFormat) -> Result<()> {
    let ctx = Context::load()?;
    let queue_path = ctx.queue_path();
    let state = match read_snapshot(&queue_path) {
        Ok(items) => QueueState {
            items,
            ..QueueState::default()
        },
        Err(e) => QueueState {
            sync_error: Some(e.to_string()),
            ..QueueState::default()
        },
    };
    let status = build(&ctx, &state, &ctx.config.retry, is_owned(&queue_path));
    run_impl(&status, output, &mut std::io::stdout())
}

pub(crate) fn build(
    ctx: &Context,
    state: &QueueState,
    policy: &RetryPolicy,
    watcher_running: bool,
) -> StatusJson {
    let summary = state.summary(policy);
    StatusJson {
        data_dir: ctx.data_dir.display().to_string(),
        remote: ctx.config.remote.base_url.clone(),
        pending_count: summary.pending_count,
        failed_count: summary.failed_count,
        stalled_count: summary.stalled_count,
        oldest_created_at: summary.oldest_created_at,
        sync_error: summary.sync_error,
        watcher_running,
    }
}

pub(crate) fn run_impl(
    status: &StatusJson,
    output: ReportFormat,
    out: &mut impl Write,
) -> Result<()> {
    match output {
        ReportFormat::Text => {
            writeln!(out, "Data dir: {}", status.data_dir)?;
            writeln!(out, "Remote:   {}", status.remote)?;
            writeln!(
                out,
                "Pending:  {} ({} failed, {} stalled)",
                status.pending_count, status.failed_count, status.stalled_count
            )?;
            if let Some(oldest) = status.oldest_created_at {
                writeln!(out, "Oldest:   {}", oldest.format("%Y-%m-%d %H:%M:%S UTC"))?;
            }
            let watcher = if status.watcher_running {
                "running"
            } else {
                "not running"
            };
            writeln!(out, "Watcher:  {}", watcher)?;
            if let Some(err) = &status.sync_error {
                writeln!(out, "Error:    {}", err)?;
            }
        }
        ReportFormat::Json => {
            writeln!(out, "{}", serde_json::to_string_pretty(status)?)?;
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "status_tests.rs"]
mod tests;
