// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! tallyrs - offline-first write queue for a personal-finance app.
//!
//! This crate provides the functionality behind the `tally` CLI. Every write
//! is recorded in a local queue first and replayed against the remote API when
//! it is reachable.
//!
//! # Main Components
//!
//! - [`QueueEngine`] - Owns the persisted queue and drives sync passes
//! - [`ReachabilityObserver`] - Tracks connectivity and notifies subscribers
//! - [`HttpRemote`] - Replays mutations against the remote API
//! - [`Config`] - Data directory configuration (remote, retry, probing)
//! - [`Error`] - Error types for all operations
//!
//! # Usage
//!
//! ```rust,ignore
//! use tallyrs::{config, Config, EngineOptions, HttpRemote, QueueEngine};
//!
//! let data_dir = config::data_dir();
//! let config = Config::load(&data_dir)?;
//! let remote = HttpRemote::new(config.remote.clone())?;
//! let engine = QueueEngine::open(&config::queue_path(&data_dir), remote, EngineOptions::default())?;
//! engine.enqueue(payload)?;
//! engine.process_queue().await?;
//! ```

mod cli;
mod commands;
mod env;
mod transaction;

pub mod config;
pub mod error;
pub mod sync;

pub use cli::{Cli, Command, OutputFormat, ReportFormat};
pub use config::{init_data_dir, Config};
pub use error::{Error, Result};
pub use sync::{EngineOptions, HttpRemote, QueueEngine, ReachabilityObserver};
pub use transaction::{TransactionDraft, TransactionKind};

use clap::CommandFactory;
use clap_complete::generate;
use tracing_subscriber::EnvFilter;

/// Installs the stderr log subscriber.
///
/// `RUST_LOG` wins when set; otherwise long-running commands log at `info`
/// and one-shot commands only at `warn`.
pub fn init_logging(command: &Command) {
    let default = match command {
        Command::Watch => "info",
        _ => "warn",
    };
    let filter =
        EnvFilter::try_from_env(env::vars::RUST_LOG).unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Execute a CLI command. This is the main entry point for library users
/// and provides a testable way to run commands without process execution.
pub fn run(command: Command) -> Result<()> {
    match command {
        Command::Add {
            account,
            amount,
            kind,
            category,
            currency,
            date,
            note,
            to,
        } => commands::add::run(TransactionDraft {
            account,
            amount,
            kind,
            category,
            currency,
            date,
            note,
            to_account: to,
        }),
        Command::Enqueue { kind, body } => commands::enqueue::run(&kind, &body),
        Command::List { output } => commands::list::run(output),
        Command::Status { output } => commands::status::run(output),
        Command::Sync { output } => commands::sync::run(output),
        Command::Discard { id, yes } => commands::discard::run(&id, yes),
        Command::Watch => commands::watch::run(),
        Command::Init { remote_url, force } => commands::init::run(remote_url, force),
        Command::Reset { yes } => commands::reset::run(yes),
        Command::Completion { shell } => {
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "tally", &mut std::io::stdout());
            Ok(())
        }
    }
}
