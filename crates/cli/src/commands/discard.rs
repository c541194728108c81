// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use std::io::Write;

use tally_core::MutationId;

use super::Context;
use crate::error::{Error, Result};
use crate::sync::{QueueEngine, RemoteApi};

/// Drops a pending mutation. Requires `--yes` because the write is lost.
pub fn run(id: &str, yes: bool) -> Result<()> {
    confirm(id, yes)?;
    let ctx = Context::load()?;
    let engine = ctx.open_loaded_engine(None)?;
    run_impl(&engine, id, &mut std::io::stdout())
}

fn confirm(id: &str, yes: bool) -> Result<()> {
    if yes {
        Ok(())
    } else {
        Err(Error::ConfirmationRequired {
            action: format!("discarding {}", id),
        })
    }
}

pub(crate) fn run_impl<R: RemoteApi + 'static>(
    engine: &QueueEngine<R>,
    id: &str,
    out: &mut impl Write,
) -> Result<()> {
    let removed = engine.discard(&MutationId::from(id))?;
    writeln!(out, "Discarded {} ({})", removed.id, removed.payload.kind)?;
    Ok(())
}

#[cfg(test)]
#[path = "discard_tests.rs"]
mod tests;
