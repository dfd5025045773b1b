//! Store configuration.

/// Configuration for a [`NodeStore`](crate::NodeStore).
#[derive(Clone, Debug, Default)]
pub struct StoreConfig {
    /// Prefix of generated node ids. A random ULID when unset.
    pub session_id: Option<String>,
    /// Run the schema validator on every create and update.
    pub validate_on_write: bool,
}

/// Builder for store configuration.
pub struct StoreConfigBuilder {
    config: StoreConfig,
}

impl StoreConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: StoreConfig::default(),
        }
    }

    pub fn session_id(mut self, session_id: impl Into<String>) -> Self {
        self.config.session_id = Some(session_id.into());
        self
    }

    pub fn validate_on_write(mut self, enabled: bool) -> Self {
        self.config.validate_on_write = enabled;
        self
    }

    pub fn build(self) -> StoreConfig {
        self.config
    }
}

impl Default for StoreConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let config = StoreConfigBuilder::new()
            .session_id("doc")
            .validate_on_write(true)
            .build();
        assert_eq!(config.session_id.as_deref(), Some("doc"));
        assert!(config.validate_on_write);

        let default = StoreConfig::default();
        assert!(default.session_id.is_none());
        assert!(!default.validate_on_write);
    }
}
