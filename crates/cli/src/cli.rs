// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use clap::{Parser, Subcommand, ValueEnum};
use clap_complete::Shell;

use crate::transaction::TransactionKind;

/// Output format for commands supporting structured output.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
    Ids,
}

/// Output format for commands without an id-only form.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    #[default]
    Text,
    Json,
}

// Custom help template that groups commands into sections
const HELP_TEMPLATE: &str = "{about-with-newline}
{usage-heading} {usage}

{before-help}Options:
{options}{after-help}";

const COMMANDS_HELP: &str = "\
Recording:
  add         Record a transaction (queued until synced)
  enqueue     Queue an arbitrary mutation

Queue:
  list        List pending mutations
  status      Show queue and sync status
  sync        Replay pending mutations now
  discard     Drop a pending mutation without replaying it
  watch       Sync automatically whenever the remote is reachable

Setup:
  init        Initialize the data directory
  reset       Move an unreadable queue file aside
  completion  Generate shell completions";

const QUICKSTART_HELP: &str = "\
Get started:
  tally init --remote-url https://api.example.com   Point at your server
  tally add checking 12.50 --category groceries      Record an expense
  tally status                                       See what is pending
  tally sync                                         Push pending writes";

#[derive(Parser)]
#[command(name = "tally")]
#[command(version)]
#[command(about = "Offline-first transaction recorder with a durable sync queue")]
#[command(
    long_about = "Offline-first transaction recorder.\n\n\
    Every write lands in a local queue first and is replayed against the\n\
    remote API in order once connectivity allows."
)]
#[command(help_template = HELP_TEMPLATE)]
#[command(before_help = COMMANDS_HELP)]
#[command(after_help = QUICKSTART_HELP)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    // ─────────────────────────────────────────────────────────────────────────
    // Recording
    // ─────────────────────────────────────────────────────────────────────────
    /// Record a transaction
    #[command(after_help = "Examples:\n  \
        tally add checking 12.50                          Expense in EUR dated today\n  \
        tally add checking 2400 --kind income             Income\n  \
        tally add checking 100 --kind transfer --to savings\n  \
        tally add card 9.99 -c subscriptions --currency usd --date 2026-01-31")]
    Add {
        /// Account the money moves out of (or into, for income)
        account: String,

        /// Positive decimal amount, e.g. 12.50
        amount: String,

        /// Transaction kind
        #[arg(long, short, value_enum, default_value = "expense")]
        kind: TransactionKind,

        /// Budget category
        #[arg(long, short)]
        category: Option<String>,

        /// ISO 4217 currency code
        #[arg(long, default_value = "EUR")]
        currency: String,

        /// Booking date (YYYY-MM-DD), defaults to today
        #[arg(long, short)]
        date: Option<String>,

        /// Free-form note
        #[arg(long, short)]
        note: Option<String>,

        /// Destination account (transfers only)
        #[arg(long)]
        to: Option<String>,
    },

    /// Queue an arbitrary mutation
    #[command(after_help = "Examples:\n  \
        tally enqueue budget.update '{\"category\":\"groceries\",\"limit\":\"400\"}'")]
    Enqueue {
        /// Dotted lowercase kind, e.g. budget.update
        kind: String,

        /// JSON body sent to the remote
        body: String,
    },

    // ─────────────────────────────────────────────────────────────────────────
    // Queue
    // ─────────────────────────────────────────────────────────────────────────
    /// List pending mutations, oldest first
    List {
        /// Output format (text, json, ids)
        #[arg(long = "output", short = 'o', value_enum, default_value = "text")]
        output: OutputFormat,
    },

    /// Show queue and sync status
    Status {
        /// Output format (text, json)
        #[arg(long = "output", short = 'o', value_enum, default_value = "text")]
        output: ReportFormat,
    },

    /// Replay pending mutations now, ignoring backoff
    Sync {
        /// Output format (text, json)
        #[arg(long = "output", short = 'o', value_enum, default_value = "text")]
        output: ReportFormat,
    },

    /// Drop a pending mutation without replaying it
    #[command(arg_required_else_help = true)]
    Discard {
        /// Mutation ID
        id: String,

        /// Confirm the write will be lost
        #[arg(long, short)]
        yes: bool,
    },

    /// Sync on startup and whenever the remote becomes reachable
    Watch,

    // ─────────────────────────────────────────────────────────────────────────
    // Setup
    // ─────────────────────────────────────────────────────────────────────────
    /// Initialize the data directory and write a config file
    Init {
        /// Base URL of the remote API
        #[arg(long)]
        remote_url: Option<String>,

        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },

    /// Move an unreadable queue file aside and start with an empty queue
    Reset {
        /// Confirm the reset
        #[arg(long, short)]
        yes: bool,
    },

    /// Generate shell completions
    #[command(arg_required_else_help = true)]
    Completion {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[cfg(test)]
#[path = "cli_tests.rs"]
mod tests;
