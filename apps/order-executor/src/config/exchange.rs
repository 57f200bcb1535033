//! Exchange adapter configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::ConfigError;
use super::credentials::ExchangeCredentials;
use crate::infrastructure::exchange::binance::{BinanceConfig, BinanceEnvironment, RetryConfig};

/// Exchange connection settings. Credentials are never read from here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExchangeSettings {
    /// `TESTNET` or `LIVE`.
    #[serde(default = "default_environment")]
    pub environment: String,
    /// Base URL override.
    #[serde(default)]
    pub base_url: Option<String>,
    /// HTTP request timeout (milliseconds).
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// `recvWindow` for signed requests (milliseconds).
    #[serde(default = "default_recv_window_ms")]
    pub recv_window_ms: u64,
    /// Retry policy for cancel and query.
    #[serde(default)]
    pub retry: RetrySettings,
}

impl Default for ExchangeSettings {
    fn default() -> Self {
        Self {
            environment: default_environment(),
            base_url: None,
            timeout_ms: default_timeout_ms(),
            recv_window_ms: default_recv_window_ms(),
            retry: RetrySettings::default(),
        }
    }
}

impl ExchangeSettings {
    /// Parsed environment.
    pub fn environment(&self) -> Result<BinanceEnvironment, ConfigError> {
        BinanceEnvironment::parse(&self.environment).ok_or_else(|| {
            ConfigError::ValidationError(format!(
                "exchange.environment must be TESTNET or LIVE, got '{}'",
                self.environment
            ))
        })
    }

    /// Build the adapter configuration with `credentials`.
    pub fn to_binance_config(
        &self,
        credentials: ExchangeCredentials,
    ) -> Result<BinanceConfig, ConfigError> {
        let (api_key, api_secret) = credentials.into_parts();
        let mut config = BinanceConfig::new(api_key, api_secret, self.environment()?)
            .with_timeout(Duration::from_millis(self.timeout_ms))
            .with_recv_window(Duration::from_millis(self.recv_window_ms))
            .with_retry(self.retry.to_retry_config());

        if let Some(base_url) = self.base_url.as_deref().filter(|url| !url.is_empty()) {
            config = config.with_base_url(base_url);
        }

        Ok(config)
    }
}

/// Retry policy for idempotent exchange requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrySettings {
    /// Attempts including the first.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// First backoff (milliseconds).
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,
    /// Backoff cap (milliseconds).
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
    /// Backoff multiplier.
    #[serde(default = "default_multiplier")]
    pub multiplier: f64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
            multiplier: default_multiplier(),
        }
    }
}

impl RetrySettings {
    /// Convert to the adapter's retry configuration.
    #[must_use]
    pub const fn to_retry_config(&self) -> RetryConfig {
        RetryConfig {
            max_attempts: self.max_attempts,
            initial_backoff: Duration::from_millis(self.initial_backoff_ms),
            max_backoff: Duration::from_millis(self.max_backoff_ms),
            multiplier: self.multiplier,
        }
    }
}

fn default_environment() -> String {
    "TESTNET".to_string()
}

const fn default_timeout_ms() -> u64 {
    300
}

const fn default_recv_window_ms() -> u64 {
    5_000
}

const fn default_max_attempts() -> u32 {
    3
}

const fn default_initial_backoff_ms() -> u64 {
    50
}

const fn default_max_backoff_ms() -> u64 {
    1_000
}

const fn default_multiplier() -> f64 {
    2.0
}
