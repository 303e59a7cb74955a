//! Configuration for advlock.
//!
//! Values are resolved with precedence CLI > config file > defaults. The
//! config file is `.advlock/config.toml`, found by searching upward from the
//! working directory.

mod config;
mod error;

pub use config::{
    CliArgs, Config, ConfigBuilder, ConfigSource, DEFAULT_RETRY_DELAY_MS, LockSettings,
    LoggingSettings, MAX_RETRY_DELAY_MS, parse_permissions,
};
pub use error::ConfigError;
