//! core::config
//!
//! Configuration loading and resolved accessors.
//!
//! # Precedence
//!
//! Values resolve in this order (later overrides earlier):
//! 1. Default values
//! 2. The config file
//! 3. CLI flags (not handled here)
//!
//! # Config Locations
//!
//! The first existing file wins:
//! 1. An explicit path passed to [`Config::load`]
//! 2. `$GITPANE_CONFIG` if set
//! 3. `$XDG_CONFIG_HOME/gitpane/config.toml`
//! 4. `~/.gitpane/config.toml`
//!
//! # Example
//!
//! ```no_run
//! use gitpane::core::config::Config;
//!
//! let config = Config::load(None).unwrap();
//! println!("network timeout: {:?}", config.network_timeout());
//! ```

pub mod schema;

pub use schema::{ConfigFile, DiffConfig, HistoryConfig, LockingConfig, NetworkConfig};

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;

/// Errors from configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("invalid config value: {0}")]
    InvalidValue(String),

    #[error("config file not found: {0}")]
    NotFound(PathBuf),
}

const DEFAULT_LOCK_WAIT: Duration = Duration::from_millis(2000);
const DEFAULT_LOCK_RETRY: Duration = Duration::from_millis(50);
const DEFAULT_NETWORK_TIMEOUT: Duration = Duration::from_secs(120);
const DEFAULT_CONTEXT_LINES: u32 = 3;
const DEFAULT_RENAME_THRESHOLD: u16 = 50;
const DEFAULT_MAX_INLINE_BYTES: u64 = 2 * 1024 * 1024;

/// Resolved configuration.
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub file: ConfigFile,
    /// Where `file` was read from, if anywhere
    loaded_from: Option<PathBuf>,
}

impl Config {
    /// Load configuration from `explicit` or the default locations.
    ///
    /// # Errors
    ///
    /// Fails if `explicit` does not exist, or if a found file cannot be
    /// read, parsed or validated. A missing default file is not an error.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            return Self::from_file(path);
        }

        match Self::default_locations().into_iter().find(|p| p.exists()) {
            Some(path) => Self::from_file(&path),
            None => Ok(Self::default()),
        }
    }

    /// Read, parse and validate one config file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;
        let file = Self::parse(path, &contents)?;
        Ok(Self {
            file,
            loaded_from: Some(path.to_path_buf()),
        })
    }

    fn parse(path: &Path, contents: &str) -> Result<ConfigFile, ConfigError> {
        let file: ConfigFile = toml::from_str(contents).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        file.validate()?;
        Ok(file)
    }

    /// Candidate files in search order.
    fn default_locations() -> Vec<PathBuf> {
        let mut paths = Vec::new();
        if let Ok(path) = std::env::var("GITPANE_CONFIG") {
            paths.push(PathBuf::from(path));
        }
        if let Ok(xdg_home) = std::env::var("XDG_CONFIG_HOME") {
            paths.push(PathBuf::from(xdg_home).join("gitpane/config.toml"));
        }
        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".gitpane/config.toml"));
        }
        paths
    }

    /// Path the configuration was loaded from.
    pub fn loaded_from(&self) -> Option<&Path> {
        self.loaded_from.as_deref()
    }

    // =========================================================================
    // Accessors with defaults applied
    // =========================================================================

    /// Bounded wait for a handle lock. Defaults to 2s.
    pub fn lock_wait(&self) -> Duration {
        self.file
            .locking
            .as_ref()
            .and_then(|l| l.wait_ms)
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_LOCK_WAIT)
    }

    /// Poll interval while waiting on the lock file. Defaults to 50ms.
    pub fn lock_retry_interval(&self) -> Duration {
        self.file
            .locking
            .as_ref()
            .and_then(|l| l.retry_interval_ms)
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_LOCK_RETRY)
    }

    /// Bound on push/fetch/pull. Defaults to 120s.
    pub fn network_timeout(&self) -> Duration {
        self.file
            .network
            .as_ref()
            .and_then(|n| n.timeout_secs)
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_NETWORK_TIMEOUT)
    }

    /// Remote used when the branch has no upstream. Defaults to "origin".
    pub fn remote(&self) -> &str {
        self.file
            .network
            .as_ref()
            .and_then(|n| n.remote.as_deref())
            .unwrap_or("origin")
    }

    pub fn context_lines(&self) -> u32 {
        self.file
            .diff
            .as_ref()
            .and_then(|d| d.context_lines)
            .unwrap_or(DEFAULT_CONTEXT_LINES)
    }

    pub fn rename_threshold(&self) -> u16 {
        self.file
            .diff
            .as_ref()
            .and_then(|d| d.rename_threshold)
            .unwrap_or(DEFAULT_RENAME_THRESHOLD)
    }

    pub fn max_inline_bytes(&self) -> u64 {
        self.file
            .diff
            .as_ref()
            .and_then(|d| d.max_inline_bytes)
            .unwrap_or(DEFAULT_MAX_INLINE_BYTES)
    }

    /// Limit applied to history requests that name none.
    pub fn default_history_limit(&self) -> Option<usize> {
        self.file
            .history
            .as_ref()
            .and_then(|h| h.default_limit)
            .filter(|limit| *limit > 0)
    }
}
