// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use std::io::Write;

use tally_core::MutationPayload;

use super::Context;
use crate::error::{Error, Result};
use crate::sync::{QueueEngine, RemoteApi};

/// Queues an arbitrary mutation and prints its id.
pub fn run(kind: &str, body: &str) -> Result<()> {
    let ctx = Context::load()?;
    let engine = ctx.open_loaded_engine(None)?;
    run_impl(&engine, kind, body, &mut std::io::stdout())
}

pub(crate) fn run_impl<R: RemoteApi + 'static>(
    engine: &QueueEngine<R>,
    kind: &str,
    body: &str,
    out: &mut impl Write,
) -> Result<()> {
    let body: serde_json::Value =
        serde_json::from_str(body).map_err(|e| Error::InvalidPayload(e.to_string()))?;
    if !body.is_object() {
        return Err(Error::InvalidPayload("body must be a JSON object".to_string()));
    }
    let payload = MutationPayload::new(kind, body)?;
    let mutation = engine.enqueue(payload)?;
    writeln!(out, "{}", mutation.id)?;
    Ok(())
}

#[cfg(test)]
#[path = "enqueue_tests.rs"]
mod tests;
