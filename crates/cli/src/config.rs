// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Configuration management.
//!
//! Configuration is stored in `<data dir>/config.toml` and includes:
//! - `remote`: where queued mutations are replayed
//! - `retry`: backoff and stall ceiling for failed replays
//! - `reachability`: how often `tally watch` probes the remote
//!
//! Every field has a default, so a missing file is a valid configuration.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tally_core::RetryPolicy;

use crate::env;
use crate::error::{Error, Result};

const APP_DIR_NAME: &str = "tally";
const CONFIG_FILE_NAME: &str = "config.toml";
const QUEUE_FILE_NAME: &str = "queue.jsonl";

/// Configuration stored in `config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub remote: RemoteConfig,
    #[serde(default)]
    pub retry: RetryPolicy,
    #[serde(default)]
    pub reachability: ReachabilityConfig,
}

/// Remote API configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteConfig {
    /// Base URL every endpoint is appended to (http:// or https://).
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Per-request timeout in seconds (default: 10).
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Bearer token sent with every request.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    /// Endpoint path per mutation kind. Kinds not listed map to
    /// `/<kind with dots replaced by slashes>`.
    #[serde(default = "default_endpoints")]
    pub endpoints: BTreeMap<String, String>,
}

fn default_base_url() -> String {
    "http://localhost:8080/api".to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_endpoints() -> BTreeMap<String, String> {
    BTreeMap::from([("transaction.create".to_string(), "/transactions".to_string())])
}

impl Default for RemoteConfig {
    fn default() -> Self {
        RemoteConfig {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
            token: None,
            endpoints: default_endpoints(),
        }
    }
}

impl RemoteConfig {
    /// Validates that the base URL is http(s).
    ///
    /// Returns an error message if the URL is invalid.
    pub fn validate_url(&self) -> Option<String> {
        let url = &self.base_url;
        let rest = url
            .strip_prefix("http://")
            .or_else(|| url.strip_prefix("https://"));
        match rest {
            Some(host) if !host.is_empty() && !host.starts_with('/') => None,
            Some(_) => Some(format!("invalid remote URL '{}': missing host", url)),
            None => Some(format!(
                "invalid remote URL '{}': must start with http:// or https://",
                url
            )),
        }
    }

    /// Returns the endpoint path for a mutation kind.
    pub fn endpoint_for(&self, kind: &str) -> String {
        match self.endpoints.get(kind) {
            Some(path) if path.starts_with('/') => path.clone(),
            Some(path) => format!("/{}", path),
            None => format!("/{}", kind.replace('.', "/")),
        }
    }

    /// Returns the full URL for a mutation kind.
    pub fn url_for(&self, kind: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), self.endpoint_for(kind))
    }

    /// Returns `(host, port)` of the base URL, for reachability probes.
    pub fn host_port(&self) -> Option<(String, u16)> {
        let (rest, default_port) = if let Some(rest) = self.base_url.strip_prefix("https://") {
            (rest, 443)
        } else if let Some(rest) = self.base_url.strip_prefix("http://") {
            (rest, 80)
        } else {
            return None;
        };

        let authority = rest.split('/').next().unwrap_or_default();
        let authority = authority.rsplit('@').next().unwrap_or_default();
        if authority.is_empty() {
            return None;
        }

        // Bracketed IPv6 literal, optionally with a port.
        if let Some(v6) = authority.strip_prefix('[') {
            let (host, after) = v6.split_once(']')?;
            let port = match after.strip_prefix(':') {
                Some(p) => p.parse().ok()?,
                None => default_port,
            };
            return Some((host.to_string(), port));
        }

        match authority.rsplit_once(':') {
            Some((host, port)) => Some((host.to_string(), port.parse().ok()?)),
            None => Some((authority.to_string(), default_port)),
        }
    }
}

/// Reachability probe configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReachabilityConfig {
    /// Delay between probes in milliseconds (default: 5000).
    #[serde(default = "default_probe_interval_ms")]
    pub probe_interval_ms: u64,
    /// Max time for a single probe in milliseconds (default: 2000).
    #[serde(default = "default_probe_timeout_ms")]
    pub probe_timeout_ms: u64,
}

fn default_probe_interval_ms() -> u64 {
    5_000
}

fn default_probe_timeout_ms() -> u64 {
    2_000
}

impl Default for ReachabilityConfig {
    fn default() -> Self {
        ReachabilityConfig {
            probe_interval_ms: default_probe_interval_ms(),
            probe_timeout_ms: default_probe_timeout_ms(),
        }
    }
}

impl Config {
    /// Loads configuration from `data_dir`, falling back to defaults when the
    /// file does not exist.
    pub fn load(data_dir: &Path) -> Result<Self> {
        let path = data_dir.join(CONFIG_FILE_NAME);
        let content = match fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Config::default()),
            Err(e) => return Err(e.into()),
        };
        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        if let Some(msg) = config.remote.validate_url() {
            return Err(Error::Config(msg));
        }
        Ok(config)
    }

    /// Saves configuration to `data_dir`.
    pub fn save(&self, data_dir: &Path) -> Result<()> {
        fs::create_dir_all(data_dir)?;
        let content = toml::to_string_pretty(self).map_err(|e| Error::Config(e.to_string()))?;
        fs::write(data_dir.join(CONFIG_FILE_NAME), content)?;
        Ok(())
    }

    /// Applies `TALLY_REMOTE_URL` on top of the file configuration.
    pub fn with_env_overrides(mut self) -> Result<Self> {
        if let Some(url) = env::remote_url() {
            self.remote.base_url = url;
            if let Some(msg) = self.remote.validate_url() {
                return Err(Error::Config(msg));
            }
        }
        Ok(self)
    }
}

/// Picks the data directory: explicit override, then `$XDG_STATE_HOME/tally`,
/// then the platform state dir, then `~/.local/state/tally`.
pub fn resolve_data_dir(
    override_dir: Option<PathBuf>,
    xdg_state_home: Option<PathBuf>,
    platform_state_dir: Option<PathBuf>,
) -> PathBuf {
    if let Some(dir) = override_dir {
        return dir;
    }
    if let Some(xdg) = xdg_state_home.filter(|p| p.is_absolute()) {
        return xdg.join(APP_DIR_NAME);
    }
    if let Some(state) = platform_state_dir {
        return state.join(APP_DIR_NAME);
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".local")
        .join("state")
        .join(APP_DIR_NAME)
}

/// Returns the data directory for this process.
pub fn data_dir() -> PathBuf {
    resolve_data_dir(env::data_dir(), env::xdg_state_home(), dirs::state_dir())
}

/// Returns the path of the queue file inside `data_dir`.
pub fn queue_path(data_dir: &Path) -> PathBuf {
    data_dir.join(QUEUE_FILE_NAME)
}

/// Creates `data_dir` and writes a config file.
///
/// # Errors
///
/// Returns [`Error::AlreadyInitialized`] if a config file exists and `force`
/// is false.
pub fn init_data_dir(data_dir: &Path, base_url: Option<String>, force: bool) -> Result<Config> {
    let config_path = data_dir.join(CONFIG_FILE_NAME);
    if config_path.exists() && !force {
        return Err(Error::AlreadyInitialized(data_dir.display().to_string()));
    }

    let mut config = Config::default();
    if let Some(url) = base_url {
        config.remote.base_url = url;
    }
    if let Some(msg) = config.remote.validate_url() {
        return Err(Error::Config(msg));
    }

    config.save(data_dir)?;
    Ok(config)
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
