//! Rate limiter configuration.

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::resilience::{RateLimitTier, RateLimiter};

/// Rate limit tiers: defaults plus per-key replacements.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Tiers used for any key without an override.
    #[serde(default = "default_tiers")]
    pub default: Vec<TierSettings>,
    /// Per-key tiers (`create_order`, `cancel_order`, `query_order`).
    #[serde(default)]
    pub keys: HashMap<String, Vec<TierSettings>>,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            default: default_tiers(),
            keys: HashMap::new(),
        }
    }
}

impl RateLimitConfig {
    /// Build the keyed rate limiter.
    #[must_use]
    pub fn to_rate_limiter(&self) -> RateLimiter {
        self.keys.iter().fold(
            RateLimiter::new(to_tiers(&self.default)),
            |limiter, (key, tiers)| limiter.with_key_tiers(key.clone(), to_tiers(tiers)),
        )
    }

    /// Every configured tier, with the key it belongs to (`None` for defaults).
    pub(crate) fn all_tiers(&self) -> impl Iterator<Item = (Option<&str>, &TierSettings)> {
        self.default.iter().map(|tier| (None, tier)).chain(
            self.keys
                .iter()
                .flat_map(|(key, tiers)| tiers.iter().map(move |tier| (Some(key.as_str()), tier))),
        )
    }
}

/// One token-bucket tier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TierSettings {
    /// Tier name for logs.
    pub name: String,
    /// Bucket capacity.
    pub capacity: u32,
    /// Time to refill an empty bucket (milliseconds).
    pub window_ms: u64,
}

impl TierSettings {
    /// Convert to a limiter tier.
    #[must_use]
    pub fn to_tier(&self) -> RateLimitTier {
        RateLimitTier::new(
            self.name.clone(),
            self.capacity,
            Duration::from_millis(self.window_ms),
        )
    }
}

fn to_tiers(settings: &[TierSettings]) -> Vec<RateLimitTier> {
    settings.iter().map(TierSettings::to_tier).collect()
}

fn default_tiers() -> Vec<TierSettings> {
    RateLimitTier::exchange_order_defaults()
        .into_iter()
        .map(|tier| TierSettings {
            name: tier.name,
            capacity: tier.capacity,
            window_ms: tier.window.as_millis() as u64,
        })
        .collect()
}
