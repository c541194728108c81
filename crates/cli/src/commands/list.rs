// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use std::io::Write;

use serde::Serialize;
use tally_core::{QueuedMutation, RetryPolicy};

use super::{record_status, Context};
use crate::cli::OutputFormat;
use crate::error::{Error, Result};
use crate::sync::read_snapshot;

/// JSON representation of a queued mutation for list output.
#[derive(Serialize)]
struct ListItemJson<'a> {
    #[serde(flatten)]
    mutation: &'a QueuedMutation,
    status: &'static str,
}

/// Lists pending mutations, oldest first.
///
/// Reads the queue file directly, so it works while `tally watch` owns it.
pub fn run(output: OutputFormat) -> Result<()> {
    let ctx = Context::load()?;
    let items = read_snapshot(&ctx.queue_path())
        .map_err(|e| Error::QueueUnreadable(e.to_string()))?;
    run_impl(&items, &ctx.config.retry, output, &mut std::io::stdout())
}

pub(crate) fn run_impl(
    items: &[QueuedMutation],
    policy: &RetryPolicy,
    output: OutputFormat,
    out: &mut impl Write,
) -> Result<()> {
    match output {
        OutputFormat::Text => {
            for m in items {
                writeln!(out, "{}", format_line(m, policy))?;
            }
        }
        OutputFormat::Json => {
            let json: Vec<_> = items
                .iter()
                .map(|m| ListItemJson {
                    mutation: m,
                    status: record_status(m, policy),
                })
                .collect();
            writeln!(out, "{}", serde_json::to_string_pretty(&json)?)?;
        }
        OutputFormat::Ids => {
            for m in items {
                writeln!(out, "{}", m.id)?;
            }
        }
    }
    Ok(())
}

/// `<id>  <status>  <kind>  <created>[  (<n>x: <error>)]`
pub(crate) fn format_line(m: &QueuedMutation, policy: &RetryPolicy) -> String {
    let mut line = format!(
        "{}  {:<7}  {}  {}",
        m.id,
        record_status(m, policy),
        m.payload.kind,
        m.created_at.format("%Y-%m-%d %H:%M")
    );
    if let Some(err) = &m.last_error {
        line.push_str(&format!("  ({}x: {})", m.retry_count, err));
    }
    line
}

#[cfg(test)]
#[path = "list_tests.rs"]
mod tests;
