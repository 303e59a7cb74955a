use std::collections::BTreeMap;

use super::{Config, DEFAULT_RETRY_DELAY_MS};

impl Config {
    /// Effective configuration as `key -> (value, source)`, sorted by key.
    #[must_use]
    pub fn effective_config(&self) -> BTreeMap<String, (String, String)> {
        let mut config = BTreeMap::new();
        let mut add = |key: &str, value: String| {
            config.insert(key.to_string(), (value, self.source_of(key).to_string()));
        };

        add(
            "retry_delay_ms",
            self.lock
                .retry_delay_ms
                .unwrap_or(DEFAULT_RETRY_DELAY_MS)
                .to_string(),
        );
        add(
            "permissions",
            match self.permissions() {
                Ok(mode) => format!("{mode:o}"),
                Err(_) => self.lock.permissions.clone().unwrap_or_default(),
            },
        );
        add("read_write", self.read_write().to_string());
        add("verbose", self.verbose().to_string());

        config
    }
}
