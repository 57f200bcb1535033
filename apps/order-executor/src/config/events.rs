//! Event bus configuration.

use serde::{Deserialize, Serialize};

/// Order update bus settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventsSettings {
    /// Updates buffered per subscriber before the oldest are dropped.
    #[serde(default = "default_capacity")]
    pub capacity: usize,
}

impl Default for EventsSettings {
    fn default() -> Self {
        Self {
            capacity: default_capacity(),
        }
    }
}

const fn default_capacity() -> usize {
    1_024
}
