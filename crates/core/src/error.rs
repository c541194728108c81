// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for tally-core operations.

use thiserror::Error;

/// All possible errors that can occur in tally-core operations.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid mutation kind: '{0}'\n  hint: kinds are dotted lowercase tags such as 'transaction.create'")]
    InvalidKind(String),

    #[error("corrupted queue data at line {line}: {reason}\n  hint: the queue file was left untouched; fix or move it aside before retrying")]
    CorruptedData { line: usize, reason: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A specialized Result type for tally-core operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
