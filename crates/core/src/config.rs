//! Configuration file handling
//!
//! The tool works without any configuration file. When `config.toml`
//! exists in the configuration directory its values become the defaults
//! that command-line options then override.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::retry::RetryPolicy;

/// Environment variable overriding the configuration directory
pub const CONFIG_DIR_ENV: &str = "BT_CONFIG_DIR";

const CONFIG_FILE: &str = "config.toml";

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory for spooled transfers; system temp dir when unset
    pub temp_dir: Option<PathBuf>,

    /// Print full error detail on failure
    pub debug_output: bool,

    pub sync: SyncSettings,
}

/// `[sync]` table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncSettings {
    /// Attempts per file, including the first one
    pub max_attempts: u32,

    /// Base of the exponential backoff, in milliseconds
    pub backoff_base_ms: u64,

    /// Allow in-memory transfers when both backends support them
    pub streaming: bool,
}

impl Default for SyncSettings {
    fn default() -> Self {
        let policy = RetryPolicy::default();
        Self {
            max_attempts: policy.max_attempts,
            backoff_base_ms: policy.backoff_base_ms,
            streaming: true,
        }
    }
}

impl SyncSettings {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts.max(1),
            backoff_base_ms: self.backoff_base_ms,
        }
    }
}

/// Locates and loads the configuration file
#[derive(Debug, Clone)]
pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    /// Use `$BT_CONFIG_DIR`, falling back to the platform config directory
    pub fn new() -> Result<Self> {
        let dir = match std::env::var_os(CONFIG_DIR_ENV) {
            Some(dir) => PathBuf::from(dir),
            None => dirs::config_dir()
                .ok_or_else(|| Error::Config("Cannot determine config directory".into()))?
                .join("bt"),
        };
        Ok(Self::with_dir(dir))
    }

    pub fn with_dir(dir: impl AsRef<Path>) -> Self {
        Self {
            config_path: dir.as_ref().join(CONFIG_FILE),
        }
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Load the configuration, or defaults when the file does not exist
    pub fn load(&self) -> Result<Config> {
        let content = match std::fs::read_to_string(&self.config_path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %self.config_path.display(), "No config file, using defaults");
                return Ok(Config::default());
            }
            Err(e) => return Err(e.into()),
        };

        toml::from_str(&content).map_err(|e| {
            Error::Config(format!("{}: {e}", self.config_path.display()))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = ConfigManager::with_dir(dir.path()).load().unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.sync.max_attempts, 3);
        assert_eq!(config.sync.backoff_base_ms, 100);
        assert!(config.sync.streaming);
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("config.toml"),
            "debug_output = true\n\n[sync]\nmax_attempts = 5\n",
        )
        .unwrap();

        let config = ConfigManager::with_dir(dir.path()).load().unwrap();
        assert!(config.debug_output);
        assert_eq!(config.sync.max_attempts, 5);
        assert_eq!(config.sync.backoff_base_ms, 100);
        assert_eq!(config.temp_dir, None);
    }

    #[test]
    fn test_malformed_file_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("config.toml"), "[sync\nmax_attempts = ").unwrap();

        let err = ConfigManager::with_dir(dir.path()).load().unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert!(err.is_user_error());
    }

    #[test]
    fn test_retry_policy_never_zero_attempts() {
        let settings = SyncSettings {
            max_attempts: 0,
            ..Default::default()
        };
        assert_eq!(settings.retry_policy().max_attempts, 1);
    }
}
