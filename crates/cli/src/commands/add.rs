// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use std::io::Write;

use chrono::{Local, NaiveDate};

use super::Context;
use crate::error::Result;
use crate::sync::{QueueEngine, RemoteApi};
use crate::transaction::TransactionDraft;

/// Records a transaction in the queue and prints its mutation id.
pub fn run(draft: TransactionDraft) -> Result<()> {
    let ctx = Context::load()?;
    let engine = ctx.open_loaded_engine(None)?;
    let today = Local::now().date_naive();
    run_impl(&engine, &draft, today, &mut std::io::stdout())
}

pub(crate) fn run_impl<R: RemoteApi + 'static>(
    engine: &QueueEngine<R>,
    draft: &TransactionDraft,
    today: NaiveDate,
    out: &mut impl Write,
) -> Result<()> {
    let payload = draft.build(today)?.into_payload()?;
    let mutation = engine.enqueue(payload)?;
    writeln!(out, "{}", mutation.id)?;
    Ok(())
}

#[cfg(test)]
#[path = "add_tests.rs"]
mod tests;
