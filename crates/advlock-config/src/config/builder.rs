use std::time::Duration;

use super::{Config, ConfigSource};
use crate::error::ConfigError;

impl Config {
    /// Create a builder for programmatic configuration.
    ///
    /// ```rust
    /// use advlock_config::Config;
    /// use std::time::Duration;
    ///
    /// let config = Config::builder()
    ///     .retry_delay(Duration::from_millis(50))
    ///     .permissions(0o640)
    ///     .build()
    ///     .expect("valid config");
    /// assert_eq!(config.retry_delay(), Duration::from_millis(50));
    /// ```
    #[must_use]
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }
}

/// Builder for [`Config`] that bypasses file discovery.
///
/// Values set here are attributed to [`ConfigSource::Programmatic`].
#[derive(Debug, Clone, Default)]
pub struct ConfigBuilder {
    retry_delay: Option<Duration>,
    permissions: Option<u32>,
    read_write: Option<bool>,
    verbose: Option<bool>,
}

impl ConfigBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = Some(delay);
        self
    }

    #[must_use]
    pub fn permissions(mut self, mode: u32) -> Self {
        self.permissions = Some(mode);
        self
    }

    #[must_use]
    pub fn read_write(mut self, read_write: bool) -> Self {
        self.read_write = Some(read_write);
        self
    }

    #[must_use]
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = Some(verbose);
        self
    }

    /// Build and validate the configuration.
    pub fn build(self) -> Result<Config, ConfigError> {
        let mut config = Config::default();

        if let Some(delay) = self.retry_delay {
            let millis = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
            config.lock.retry_delay_ms = Some(millis);
            config.attribute("retry_delay_ms", ConfigSource::Programmatic);
        }
        if let Some(mode) = self.permissions {
            config.lock.permissions = Some(format!("{mode:o}"));
            config.attribute("permissions", ConfigSource::Programmatic);
        }
        if let Some(read_write) = self.read_write {
            config.lock.read_write = Some(read_write);
            config.attribute("read_write", ConfigSource::Programmatic);
        }
        if let Some(verbose) = self.verbose {
            config.logging.verbose = Some(verbose);
            config.attribute("verbose", ConfigSource::Programmatic);
        }

        config.validate()?;
        Ok(config)
    }
}
