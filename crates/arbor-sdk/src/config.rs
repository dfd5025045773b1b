//! Lock and editor configuration.

use std::time::Duration;

/// Configuration for the mutation lock.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LockConfig {
    /// How long a queued request waits for its grant.
    pub wait_timeout: Duration,
    /// How long a grant may be held before it is force-released.
    pub safety_timeout: Duration,
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            wait_timeout: Duration::from_secs(5),
            safety_timeout: Duration::from_secs(50),
        }
    }
}

/// Builder for lock configuration.
pub struct LockConfigBuilder {
    config: LockConfig,
    safety_set: bool,
}

impl LockConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: LockConfig::default(),
            safety_set: false,
        }
    }

    /// Sets the wait timeout. Unless set explicitly, the safety timeout
    /// follows at ten times this value.
    pub fn wait_timeout(mut self, timeout: Duration) -> Self {
        self.config.wait_timeout = timeout;
        if !self.safety_set {
            self.config.safety_timeout = timeout * 10;
        }
        self
    }

    pub fn safety_timeout(mut self, timeout: Duration) -> Self {
        self.config.safety_timeout = timeout;
        self.safety_set = true;
        self
    }

    pub fn build(self) -> LockConfig {
        self.config
    }
}

impl Default for LockConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Configuration for an [`Editor`](crate::Editor).
#[derive(Clone, Debug)]
pub struct EditorConfig {
    /// Prepended to every owner id the editor presents to the lock.
    pub owner_prefix: String,
    /// Capacity of the operation broadcast channel.
    pub event_capacity: usize,
    pub lock: LockConfig,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            owner_prefix: "editor".to_string(),
            event_capacity: 256,
            lock: LockConfig::default(),
        }
    }
}
