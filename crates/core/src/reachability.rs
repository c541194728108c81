// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Connectivity snapshots reported by the platform.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Link-layer connectivity plus tri-state internet reachability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReachabilitySnapshot {
    pub is_connected: bool,
    /// `None` when the platform does not know yet.
    pub is_internet_reachable: Option<bool>,
}

impl ReachabilitySnapshot {
    pub fn new(is_connected: bool, is_internet_reachable: Option<bool>) -> Self {
        ReachabilitySnapshot {
            is_connected,
            is_internet_reachable,
        }
    }

    /// No link at all.
    pub fn offline() -> Self {
        Self::new(false, Some(false))
    }

    /// Link up and internet confirmed.
    pub fn online() -> Self {
        Self::new(true, Some(true))
    }

    /// Returns true if outbound requests are worth attempting.
    ///
    /// Unknown reachability counts as usable; an explicit `false` does not,
    /// even with a live link (captive portals).
    pub fn is_usable(&self) -> bool {
        self.is_connected && self.is_internet_reachable != Some(false)
    }
}

impl fmt::Display for ReachabilitySnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reachable = match self.is_internet_reachable {
            Some(true) => "reachable",
            Some(false) => "unreachable",
            None => "unknown",
        };
        let link = if self.is_connected {
            "connected"
        } else {
            "disconnected"
        };
        write!(f, "{link}/{reachable}")
    }
}

#[cfg(test)]
#[path = "reachability_tests.rs"]
mod tests;
