// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use std::path::PathBuf;

use thiserror::Error;

/// All possible errors that can occur in the tallyrs library.
///
/// Errors provide user-friendly messages with hints for common issues.
#[derive(Debug, Error)]
pub enum Error {
    #[error("mutation not found: {0}")]
    MutationNotFound(String),

    #[error("invalid mutation kind: '{0}'\n  hint: kinds are dotted lowercase tags such as 'transaction.create'")]
    InvalidKind(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("queue is unreadable: {0}\n  hint: repair the file, or run 'tally reset --yes' to move it aside")]
    QueueUnreadable(String),

    #[error("queue at {} is in use by another process\n  hint: stop any running 'tally watch' first", .0.display())]
    QueueLocked(PathBuf),

    #[error("already initialized at {0}")]
    AlreadyInitialized(String),

    #[error("invalid amount '{value}': {reason}")]
    InvalidAmount { value: String, reason: &'static str },

    #[error("invalid currency '{0}'\n  hint: use a three-letter ISO 4217 code such as EUR or USD")]
    InvalidCurrency(String),

    #[error("invalid date '{0}'\n  hint: use YYYY-MM-DD")]
    InvalidDate(String),

    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    #[error("{field} cannot be empty")]
    FieldEmpty { field: &'static str },

    #[error("{action} cannot be undone\n  hint: re-run with --yes to confirm")]
    ConfirmationRequired { action: String },

    #[error("remote error: {0}")]
    Remote(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A specialized Result type for tallyrs operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<tally_core::Error> for Error {
    fn from(e: tally_core::Error) -> Self {
        match e {
            tally_core::Error::InvalidKind(kind) => Error::InvalidKind(kind),
            e @ tally_core::Error::CorruptedData { .. } => Error::Storage(e.to_string()),
            tally_core::Error::Io(e) => Error::Storage(e.to_string()),
            tally_core::Error::Json(e) => Error::Storage(e.to_string()),
        }
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
