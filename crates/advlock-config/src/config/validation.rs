use super::{Config, MAX_RETRY_DELAY_MS};
use crate::error::ConfigError;

impl Config {
    /// Check resolved values for consistency.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(delay) = self.lock.retry_delay_ms {
            if delay == 0 {
                return Err(ConfigError::InvalidValue {
                    key: "retry_delay_ms".to_string(),
                    value: "must be greater than 0".to_string(),
                });
            }
            if delay > MAX_RETRY_DELAY_MS {
                return Err(ConfigError::InvalidValue {
                    key: "retry_delay_ms".to_string(),
                    value: format!("{delay} exceeds the maximum of {MAX_RETRY_DELAY_MS}"),
                });
            }
        }

        self.permissions()?;
        Ok(())
    }
}
