// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use std::io::Write;

use super::Context;
use crate::error::{Error, Result};
use crate::sync::{QueueEngine, RemoteApi};

/// Moves an unreadable queue file aside. A readable queue is left alone.
pub fn run(yes: bool) -> Result<()> {
    if !yes {
        return Err(Error::ConfirmationRequired {
            action: "resetting the queue".to_string(),
        });
    }
    let ctx = Context::load()?;
    let engine = ctx.open_engine(None)?;
    run_impl(&engine, &mut std::io::stdout())
}

pub(crate) fn run_impl<R: RemoteApi + 'static>(
    engine: &QueueEngine<R>,
    out: &mut impl Write,
) -> Result<()> {
    if engine.state().sync_error.is_none() {
        writeln!(out, "Queue is readable; nothing to reset")?;
        return Ok(());
    }

    match engine.reset_storage()? {
        Some(moved) => writeln!(out, "Moved unreadable queue to {}", moved.display())?,
        None => writeln!(out, "Started a new empty queue")?,
    }
    Ok(())
}

#[cfg(test)]
#[path = "reset_tests.rs"]
mod tests;
