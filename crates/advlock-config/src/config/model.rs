use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use advlock_lock::{DEFAULT_PERMISSIONS, FlockOptions, REQUIRES_WRITABLE_DESCRIPTOR};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Default interval between polling attempts, in milliseconds.
pub const DEFAULT_RETRY_DELAY_MS: u64 = 100;

/// Upper bound accepted for `retry_delay_ms` (one hour).
pub const MAX_RETRY_DELAY_MS: u64 = 3_600_000;

/// Where a configuration value came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigSource {
    /// Command-line flag (highest precedence).
    Cli,
    /// Config file.
    Config,
    /// `Config::builder()`.
    Programmatic,
    /// Built-in default (lowest precedence).
    Default,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cli => write!(f, "cli"),
            Self::Config => write!(f, "config"),
            Self::Programmatic => write!(f, "programmatic"),
            Self::Default => write!(f, "default"),
        }
    }
}

/// `[lock]` section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LockSettings {
    /// Interval between polling attempts.
    pub retry_delay_ms: Option<u64>,
    /// Octal permission bits for newly created lock files, e.g. `"600"`.
    pub permissions: Option<String>,
    /// Open lock files read-write.
    pub read_write: Option<bool>,
}

/// `[logging]` section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingSettings {
    pub verbose: Option<bool>,
}

/// Resolved configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub lock: LockSettings,
    pub logging: LoggingSettings,
    /// Config file that contributed values, if any.
    pub config_path: Option<PathBuf>,
    /// Source of each resolved key.
    pub source_attribution: HashMap<String, ConfigSource>,
}

impl Default for Config {
    fn default() -> Self {
        let source_attribution = ["retry_delay_ms", "permissions", "read_write", "verbose"]
            .into_iter()
            .map(|key| (key.to_string(), ConfigSource::Default))
            .collect();
        Self {
            lock: LockSettings::default(),
            logging: LoggingSettings::default(),
            config_path: None,
            source_attribution,
        }
    }
}

impl Config {
    #[must_use]
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.lock.retry_delay_ms.unwrap_or(DEFAULT_RETRY_DELAY_MS))
    }

    /// Permission bits for new lock files.
    pub fn permissions(&self) -> Result<u32, ConfigError> {
        match self.lock.permissions.as_deref() {
            Some(raw) => parse_permissions(raw),
            None => Ok(DEFAULT_PERMISSIONS),
        }
    }

    #[must_use]
    pub fn read_write(&self) -> bool {
        self.lock.read_write.unwrap_or(REQUIRES_WRITABLE_DESCRIPTOR)
    }

    #[must_use]
    pub fn verbose(&self) -> bool {
        self.logging.verbose.unwrap_or(false)
    }

    /// Options for constructing [`advlock_lock::Flock`] handles.
    pub fn flock_options(&self) -> Result<FlockOptions, ConfigError> {
        Ok(FlockOptions {
            permissions: self.permissions()?,
            read_write: self.read_write(),
        })
    }

    #[must_use]
    pub fn source_of(&self, key: &str) -> ConfigSource {
        self.source_attribution
            .get(key)
            .cloned()
            .unwrap_or(ConfigSource::Default)
    }
}

/// Parse an octal permission string: `"600"`, `"0600"` or `"0o600"`.
pub fn parse_permissions(raw: &str) -> Result<u32, ConfigError> {
    let trimmed = raw.trim();
    let digits = trimmed
        .strip_prefix("0o")
        .or_else(|| trimmed.strip_prefix("0O"))
        .unwrap_or(trimmed);
    let invalid = |reason: &str| ConfigError::InvalidValue {
        key: "permissions".to_string(),
        value: format!("'{raw}' {reason}"),
    };

    if digits.is_empty() {
        return Err(invalid("is empty"));
    }
    let mode = u32::from_str_radix(digits, 8).map_err(|_| invalid("is not an octal number"))?;
    if mode > 0o777 {
        return Err(invalid("exceeds 777"));
    }
    if mode & 0o400 == 0 {
        return Err(invalid("must grant the owner read access"));
    }
    Ok(mode)
}
