//! core::config::schema
//!
//! Configuration file schema.
//!
//! Every key is optional; absent keys fall back to the defaults applied by
//! the accessors on [`super::Config`].
//!
//! ```toml
//! [locking]
//! wait_ms = 2000
//! retry_interval_ms = 50
//!
//! [network]
//! timeout_secs = 120
//! remote = "origin"
//!
//! [diff]
//! context_lines = 3
//! rename_threshold = 50
//! max_inline_bytes = 2097152
//!
//! [history]
//! default_limit = 0
//! ```

use serde::{Deserialize, Serialize};

use super::ConfigError;
use crate::core::types::BranchName;

/// Top-level configuration file.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigFile {
    pub locking: Option<LockingConfig>,
    pub network: Option<NetworkConfig>,
    pub diff: Option<DiffConfig>,
    pub history: Option<HistoryConfig>,
}

impl ConfigFile {
    /// Validate the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` naming the offending key.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(locking) = &self.locking {
            if locking.wait_ms == Some(0) {
                return Err(ConfigError::InvalidValue(
                    "locking.wait_ms must be greater than zero".into(),
                ));
            }
            if locking.retry_interval_ms == Some(0) {
                return Err(ConfigError::InvalidValue(
                    "locking.retry_interval_ms must be greater than zero".into(),
                ));
            }
        }

        if let Some(network) = &self.network {
            if network.timeout_secs == Some(0) {
                return Err(ConfigError::InvalidValue(
                    "network.timeout_secs must be greater than zero".into(),
                ));
            }
            if let Some(remote) = &network.remote {
                BranchName::new(remote.as_str()).map_err(|e| {
                    ConfigError::InvalidValue(format!("network.remote: {e}"))
                })?;
            }
        }

        if let Some(threshold) = self.diff.as_ref().and_then(|d| d.rename_threshold) {
            if !(1..=100).contains(&threshold) {
                return Err(ConfigError::InvalidValue(format!(
                    "diff.rename_threshold must be within 1..=100, got {threshold}"
                )));
            }
        }

        Ok(())
    }
}

/// Per-handle lock behavior.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct LockingConfig {
    /// Bounded wait before surfacing lock contention
    pub wait_ms: Option<u64>,
    /// Poll interval for the cross-process lock file
    pub retry_interval_ms: Option<u64>,
}

/// Push/fetch/pull behavior.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct NetworkConfig {
    pub timeout_secs: Option<u64>,
    /// Remote used when the current branch has no upstream
    pub remote: Option<String>,
}

/// Diff rendering.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct DiffConfig {
    pub context_lines: Option<u32>,
    /// Similarity percentage above which a delete/add pair is a rename
    pub rename_threshold: Option<u16>,
    /// Blobs larger than this render as binary
    pub max_inline_bytes: Option<u64>,
}

/// History listing.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct HistoryConfig {
    /// Commit limit applied when a request names none; 0 means unbounded
    pub default_limit: Option<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_is_valid() {
        assert!(ConfigFile::default().validate().is_ok());
    }

    #[test]
    fn parses_all_sections() {
        let parsed: ConfigFile = toml::from_str(
            r#"
            [locking]
            wait_ms = 500
            [network]
            timeout_secs = 30
            remote = "upstream"
            [diff]
            context_lines = 5
            rename_threshold = 60
            [history]
            default_limit = 100
            "#,
        )
        .unwrap();
        assert!(parsed.validate().is_ok());
        assert_eq!(parsed.network.unwrap().remote.as_deref(), Some("upstream"));
    }

    #[test]
    fn zero_timeout_rejected() {
        let parsed: ConfigFile = toml::from_str("[network]\ntimeout_secs = 0").unwrap();
        assert!(parsed.validate().is_err());
    }

    #[test]
    fn rename_threshold_bounds() {
        let parsed: ConfigFile = toml::from_str("[diff]\nrename_threshold = 101").unwrap();
        assert!(parsed.validate().is_err());
    }

    #[test]
    fn invalid_remote_rejected() {
        let parsed: ConfigFile = toml::from_str("[network]\nremote = \"bad name\"").unwrap();
        assert!(parsed.validate().is_err());
    }

    #[test]
    fn unknown_keys_rejected() {
        let parsed: Result<ConfigFile, _> = toml::from_str("[diff]\ncolour = true");
        assert!(parsed.is_err());
    }
}
