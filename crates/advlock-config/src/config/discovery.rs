use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use super::{CliArgs, Config, ConfigSource, LockSettings, LoggingSettings};
use crate::error::ConfigError;

/// Directory holding the config file, relative to a project directory.
const CONFIG_DIR: &str = ".advlock";
const CONFIG_FILE: &str = "config.toml";

/// TOML configuration file structure
#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
struct TomlConfig {
    lock: Option<LockSettings>,
    logging: Option<LoggingSettings>,
}

impl Config {
    /// Discover and load configuration with precedence: CLI > file > defaults
    ///
    /// Uses the current working directory for config file discovery when no
    /// explicit path is provided in `cli_args`.
    pub fn discover(cli_args: &CliArgs) -> Result<Self> {
        let start_dir = std::env::current_dir().context("Failed to get current directory")?;
        Self::discover_from(&start_dir, cli_args)
    }

    /// Discover and load configuration starting from a specific directory.
    pub fn discover_from(start_dir: &Path, cli_args: &CliArgs) -> Result<Self> {
        let mut config = Self::default();

        let config_path = match &cli_args.config_path {
            Some(explicit) => Some(explicit.clone()),
            None => Self::discover_config_file_from(start_dir)?,
        };

        if let Some(path) = &config_path {
            let file_config = Self::load_config_file(path)
                .with_context(|| format!("Failed to load config file: {}", path.display()))?;
            config.apply_file(file_config);
            config.config_path = Some(path.clone());
        }

        config.apply_cli(cli_args);
        config.validate()?;
        Ok(config)
    }

    /// Search upward from `start_dir` for `.advlock/config.toml`.
    ///
    /// Stops at the filesystem root or at a repository root (`.git`, `.hg`,
    /// `.svn`) without a config.
    pub fn discover_config_file_from(start_dir: &Path) -> Result<Option<PathBuf>> {
        let mut current_dir = start_dir.to_path_buf();

        loop {
            let config_path = current_dir.join(CONFIG_DIR).join(CONFIG_FILE);
            if config_path.exists() {
                return Ok(Some(config_path));
            }

            if current_dir.join(".git").exists()
                || current_dir.join(".hg").exists()
                || current_dir.join(".svn").exists()
            {
                break;
            }

            match current_dir.parent() {
                Some(parent) => current_dir = parent.to_path_buf(),
                None => break,
            }
        }

        Ok(None)
    }

    fn load_config_file(path: &Path) -> Result<TomlConfig> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(|e| {
                ConfigError::InvalidFile(format!("{}: {e}", path.display())).into()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                // An explicitly named file that does not exist yields defaults.
                Ok(TomlConfig::default())
            }
            Err(e) => Err(anyhow::anyhow!(
                "Failed to read config file {}: {e}",
                path.display()
            )),
        }
    }

    fn apply_file(&mut self, file_config: TomlConfig) {
        if let Some(lock) = file_config.lock {
            if lock.retry_delay_ms.is_some() {
                self.lock.retry_delay_ms = lock.retry_delay_ms;
                self.attribute("retry_delay_ms", ConfigSource::Config);
            }
            if lock.permissions.is_some() {
                self.lock.permissions = lock.permissions;
                self.attribute("permissions", ConfigSource::Config);
            }
            if lock.read_write.is_some() {
                self.lock.read_write = lock.read_write;
                self.attribute("read_write", ConfigSource::Config);
            }
        }
        if let Some(logging) = file_config.logging
            && logging.verbose.is_some()
        {
            self.logging.verbose = logging.verbose;
            self.attribute("verbose", ConfigSource::Config);
        }
    }

    fn apply_cli(&mut self, cli_args: &CliArgs) {
        if let Some(delay) = cli_args.retry_delay_ms {
            self.lock.retry_delay_ms = Some(delay);
            self.attribute("retry_delay_ms", ConfigSource::Cli);
        }
        if let Some(permissions) = &cli_args.permissions {
            self.lock.permissions = Some(permissions.clone());
            self.attribute("permissions", ConfigSource::Cli);
        }
        if let Some(read_write) = cli_args.read_write {
            self.lock.read_write = Some(read_write);
            self.attribute("read_write", ConfigSource::Cli);
        }
        if let Some(verbose) = cli_args.verbose {
            self.logging.verbose = Some(verbose);
            self.attribute("verbose", ConfigSource::Cli);
        }
    }

    pub(super) fn attribute(&mut self, key: &str, source: ConfigSource) {
        self.source_attribution.insert(key.to_string(), source);
    }
}
