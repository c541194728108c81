// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use std::io::Write;
use std::path::Path;

use crate::config::{self, init_data_dir};
use crate::error::Result;

/// Creates the data directory and its config file.
pub fn run(remote_url: Option<String>, force: bool) -> Result<()> {
    let data_dir = config::data_dir();
    run_impl(&data_dir, remote_url, force, &mut std::io::stdout())
}

pub(crate) fn run_impl(
    data_dir: &Path,
    remote_url: Option<String>,
    force: bool,
    out: &mut impl Write,
) -> Result<()> {
    let config = init_data_dir(data_dir, remote_url, force)?;
    writeln!(out, "Initialized tally in {}", data_dir.display())?;
    writeln!(out, "Remote: {}", config.remote.base_url)?;
    Ok(())
}

#[cfg(test)]
#[path = "init_tests.rs"]
mod tests;
