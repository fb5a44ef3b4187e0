//! Check configuration with layered resolution.
//!
//! Resolution order (highest priority first):
//! 1. CLI flags (applied via `CliOverrides`)
//! 2. Environment variables (`CONFDRIFT_*`)
//! 3. Config file (`~/.confdrift/config.toml`)
//! 4. Compiled defaults

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

use crate::errors::ConfigError;

/// Resolved configuration for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckConfig {
    /// Root under which per-target snapshot stores live.
    pub store_root: PathBuf,
    /// Directory holding execution lock files.
    pub lock_dir: PathBuf,
    /// Shared directory the monitored system drops policy exports into.
    pub policy_drop_dir: PathBuf,
    /// Recency window for asynchronously produced policy files.
    pub freshness_window_secs: u64,
    /// Interval between polls of the policy drop directory.
    pub poll_interval_ms: u64,
    /// How long to keep polling before declaring a policy file stale.
    pub poll_deadline_secs: u64,
    /// External database client command.
    pub client_command: String,
}

impl Default for CheckConfig {
    fn default() -> Self {
        let tmp = std::env::temp_dir();
        Self {
            store_root: tmp.join("confdrift"),
            lock_dir: tmp.join("confdrift").join("locks"),
            policy_drop_dir: tmp,
            freshness_window_secs: 300,
            poll_interval_ms: 2000,
            poll_deadline_secs: 60,
            client_command: "db2".to_string(),
        }
    }
}

/// CLI override arguments that can be applied to a config.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    /// `-D/--directory`: snapshot store root.
    pub store_root: Option<PathBuf>,
}

/// On-disk config file shape; every field optional so the file can set
/// only what it needs. Unknown keys are silently ignored.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct FileConfig {
    store_root: Option<PathBuf>,
    lock_dir: Option<PathBuf>,
    policy_drop_dir: Option<PathBuf>,
    freshness_window_secs: Option<u64>,
    poll_interval_ms: Option<u64>,
    poll_deadline_secs: Option<u64>,
    client_command: Option<String>,
}

impl CheckConfig {
    /// Load configuration with layered resolution (see module docs).
    pub fn load(cli_overrides: Option<&CliOverrides>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        // Layer 3 (lowest above defaults): user config file
        if let Some(path) = Self::user_config_path() {
            if path.exists() {
                Self::merge_toml_file(&mut config, &path)?;
                debug!(path = %path.display(), "applied user config file");
            }
        }

        // Layer 2: environment variables
        Self::apply_env_overrides(&mut config);

        // Layer 1 (highest priority): CLI flags
        if let Some(cli) = cli_overrides {
            Self::apply_cli_overrides(&mut config, cli);
        }

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a TOML string (for testing).
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        let file: FileConfig = toml::from_str(toml_str).map_err(|e| ConfigError::ParseError {
            path: "<string>".to_string(),
            message: e.to_string(),
        })?;
        let mut config = Self::default();
        Self::merge(&mut config, &file);
        Self::validate(&config)?;
        Ok(config)
    }

    /// Validate the resolved configuration values.
    pub fn validate(config: &CheckConfig) -> Result<(), ConfigError> {
        if config.freshness_window_secs == 0 {
            return Err(ConfigError::ValidationFailed {
                field: "freshness_window_secs".to_string(),
                message: "must be greater than 0".to_string(),
            });
        }
        if config.client_command.trim().is_empty() {
            return Err(ConfigError::ValidationFailed {
                field: "client_command".to_string(),
                message: "must not be empty".to_string(),
            });
        }
        Ok(())
    }

    /// Recency window as a `Duration`.
    pub fn freshness_window(&self) -> Duration {
        Duration::from_secs(self.freshness_window_secs)
    }

    /// Poll interval as a `Duration`.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Poll deadline as a `Duration`.
    pub fn poll_deadline(&self) -> Duration {
        Duration::from_secs(self.poll_deadline_secs)
    }

    /// Returns the user config path: `~/.confdrift/config.toml`.
    fn user_config_path() -> Option<PathBuf> {
        home_dir().map(|h| h.join(".confdrift").join("config.toml"))
    }

    fn merge_toml_file(config: &mut CheckConfig, path: &Path) -> Result<(), ConfigError> {
        let content =
            std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
                path: path.display().to_string(),
            })?;
        let file: FileConfig = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::merge(config, &file);
        Ok(())
    }

    /// Merge `file` into `base`; `file` values win when present.
    fn merge(base: &mut CheckConfig, file: &FileConfig) {
        if let Some(ref v) = file.store_root {
            base.store_root = v.clone();
        }
        if let Some(ref v) = file.lock_dir {
            base.lock_dir = v.clone();
        }
        if let Some(ref v) = file.policy_drop_dir {
            base.policy_drop_dir = v.clone();
        }
        if let Some(v) = file.freshness_window_secs {
            base.freshness_window_secs = v;
        }
        if let Some(v) = file.poll_interval_ms {
            base.poll_interval_ms = v;
        }
        if let Some(v) = file.poll_deadline_secs {
            base.poll_deadline_secs = v;
        }
        if let Some(ref v) = file.client_command {
            base.client_command = v.clone();
        }
    }

    /// Apply environment variable overrides.
    /// Pattern: `CONFDRIFT_STORE_ROOT`, `CONFDRIFT_FRESHNESS_WINDOW_SECS`, etc.
    fn apply_env_overrides(config: &mut CheckConfig) {
        if let Ok(val) = std::env::var("CONFDRIFT_STORE_ROOT") {
            config.store_root = PathBuf::from(val);
        }
        if let Ok(val) = std::env::var("CONFDRIFT_LOCK_DIR") {
            config.lock_dir = PathBuf::from(val);
        }
        if let Ok(val) = std::env::var("CONFDRIFT_POLICY_DROP_DIR") {
            config.policy_drop_dir = PathBuf::from(val);
        }
        if let Ok(val) = std::env::var("CONFDRIFT_FRESHNESS_WINDOW_SECS") {
            if let Ok(v) = val.parse::<u64>() {
                config.freshness_window_secs = v;
            }
        }
        if let Ok(val) = std::env::var("CONFDRIFT_POLL_INTERVAL_MS") {
            if let Ok(v) = val.parse::<u64>() {
                config.poll_interval_ms = v;
            }
        }
        if let Ok(val) = std::env::var("CONFDRIFT_POLL_DEADLINE_SECS") {
            if let Ok(v) = val.parse::<u64>() {
                config.poll_deadline_secs = v;
            }
        }
        if let Ok(val) = std::env::var("CONFDRIFT_CLIENT_COMMAND") {
            config.client_command = val;
        }
    }

    /// Apply CLI overrides (highest priority).
    fn apply_cli_overrides(config: &mut CheckConfig, cli: &CliOverrides) {
        if let Some(ref v) = cli.store_root {
            config.store_root = v.clone();
        }
    }
}

/// Cross-platform home directory resolution.
fn home_dir() -> Option<PathBuf> {
    std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .map(PathBuf::from)
}
