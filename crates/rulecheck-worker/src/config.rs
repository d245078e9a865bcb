//! Worker pool configuration.
//!
//! `PoolConfig` is read from a camelCase JSON file and can be overridden from
//! the environment:
//!
//! - `RULECHECK_RESTART_WINDOW_MS`: restart window in milliseconds
//! - `RULECHECK_RESTART_MODE`: `within-window` or `after-window`
//! - `RULECHECK_CALL_TIMEOUT_MS`: per-call timeout; `0` or `off` disables it

use rulecheck_common::limits::{DEFAULT_FILENAME, DEFAULT_RESTART_WINDOW_MS};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

pub const ENV_RESTART_WINDOW_MS: &str = "RULECHECK_RESTART_WINDOW_MS";
pub const ENV_RESTART_MODE: &str = "RULECHECK_RESTART_MODE";
pub const ENV_CALL_TIMEOUT_MS: &str = "RULECHECK_CALL_TIMEOUT_MS";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("invalid value '{value}' for {name}")]
    InvalidEnv { name: &'static str, value: String },
}

/// When a repeated request for the same analysis address restarts the pool.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RestartMode {
    /// The second request arrives before the window has elapsed.
    #[default]
    WithinWindow,
    /// The second request arrives after the window has elapsed, i.e. the
    /// address was armed by an earlier request.
    AfterWindow,
}

impl RestartMode {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "within-window" | "within" => Some(RestartMode::WithinWindow),
            "after-window" | "after" => Some(RestartMode::AfterWindow),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PoolConfig {
    pub restart_window_ms: u64,
    pub restart_mode: RestartMode,
    /// `None`: calls block until the worker replies.
    pub call_timeout_ms: Option<u64>,
    pub default_filename: String,
    /// Stack size for worker threads; the platform default when `None`.
    pub worker_stack_size: Option<usize>,
}

impl Default for PoolConfig {
    fn default() -> Self {
        PoolConfig {
            restart_window_ms: DEFAULT_RESTART_WINDOW_MS,
            restart_mode: RestartMode::default(),
            call_timeout_ms: None,
            default_filename: DEFAULT_FILENAME.to_string(),
            worker_stack_size: None,
        }
    }
}

impl PoolConfig {
    pub fn parse(source: &str) -> Result<PoolConfig, serde_json::Error> {
        serde_json::from_str(source)
    }

    pub fn load(path: &Path) -> Result<PoolConfig, ConfigError> {
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        PoolConfig::parse(&source).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Apply `RULECHECK_*` environment overrides.
    pub fn with_env_overrides(self) -> Result<PoolConfig, ConfigError> {
        self.with_overrides(|name| std::env::var(name).ok())
    }

    /// Apply overrides from `lookup`, which maps a variable name to its value.
    pub fn with_overrides(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<PoolConfig, ConfigError> {
        let invalid = |name: &'static str, value: &str| ConfigError::InvalidEnv {
            name,
            value: value.to_string(),
        };
        if let Some(value) = lookup(ENV_RESTART_WINDOW_MS) {
            self.restart_window_ms = value
                .trim()
                .parse()
                .map_err(|_| invalid(ENV_RESTART_WINDOW_MS, &value))?;
        }
        if let Some(value) = lookup(ENV_RESTART_MODE) {
            self.restart_mode =
                RestartMode::parse(&value).ok_or_else(|| invalid(ENV_RESTART_MODE, &value))?;
        }
        if let Some(value) = lookup(ENV_CALL_TIMEOUT_MS) {
            let trimmed = value.trim();
            self.call_timeout_ms = match trimmed {
                "" | "off" | "none" | "0" => None,
                ms => Some(
                    ms.parse()
                        .map_err(|_| invalid(ENV_CALL_TIMEOUT_MS, &value))?,
                ),
            };
        }
        Ok(self)
    }

    pub fn restart_window(&self) -> Duration {
        Duration::from_millis(self.restart_window_ms)
    }

    pub fn call_timeout(&self) -> Option<Duration> {
        self.call_timeout_ms.map(Duration::from_millis)
    }
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
