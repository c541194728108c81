// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! One-shot manual sync.

use std::io::Write;

use serde::Serialize;

use super::{runtime, Context};
use crate::cli::ReportFormat;
use crate::error::Result;
use crate::sync::{PassOutcome, QueueEngine, RemoteApi};

#[derive(Debug, Serialize)]
struct SyncJson {
    coalesced: bool,
    attempted: usize,
    succeeded: usize,
    failed: usize,
    skipped: usize,
    aborted: bool,
    remaining: usize,
}

/// Replays every pending mutation once, ignoring backoff.
pub fn run(output: ReportFormat) -> Result<()> {
    let ctx = Context::load()?;
    let engine = ctx.open_loaded_engine(None)?;
    let rt = runtime()?;
    rt.block_on(run_impl(&engine, output, &mut std::io::stdout()))
}

pub(crate) async fn run_impl<R: RemoteApi + 'static>(
    engine: &QueueEngine<R>,
    output: ReportFormat,
    out: &mut impl Write,
) -> Result<()> {
    let outcome = engine.process_queue().await?;
    let remaining = engine.state().items.len();

    match output {
        ReportFormat::Text => write_text(&outcome, remaining, out)?,
        ReportFormat::Json => {
            let report = outcome.report();
            let json = SyncJson {
                coalesced: report.is_none(),
                attempted: report.map_or(0, |r| r.attempted),
                succeeded: report.map_or(0, |r| r.succeeded),
                failed: report.map_or(0, |r| r.failed),
                skipped: report.map_or(0, |r| r.skipped),
                aborted: report.is_some_and(|r| r.aborted),
                remaining,
            };
            writeln!(out, "{}", serde_json::to_string_pretty(&json)?)?;
        }
    }
    Ok(())
}

fn write_text(outcome: &PassOutcome, remaining: usize, out: &mut impl Write) -> Result<()> {
    let Some(report) = outcome.report() else {
        writeln!(out, "A sync is already running")?;
        return Ok(());
    };

    if report.attempted == 0 && remaining == 0 {
        writeln!(out, "Nothing to sync")?;
        return Ok(());
    }

    writeln!(out, "Synced {} of {} mutation(s)", report.succeeded, report.attempted)?;
    if report.failed > 0 {
        writeln!(out, "{} failed; run 'tally list' for details", report.failed)?;
    }
    if report.aborted {
        writeln!(out, "Remote unreachable; {} mutation(s) left queued", remaining)?;
    }
    Ok(())
}

#[cfg(test)]
#[path = "sync_tests.rs"]
mod tests;
