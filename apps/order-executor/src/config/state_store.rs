//! State store configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Distributed tier settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateStoreSettings {
    /// Entry TTL in the distributed tier (seconds).
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,
}

impl Default for StateStoreSettings {
    fn default() -> Self {
        Self {
            ttl_secs: default_ttl_secs(),
        }
    }
}

impl StateStoreSettings {
    /// Entry TTL.
    #[must_use]
    pub const fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

const fn default_ttl_secs() -> u64 {
    86_400
}
