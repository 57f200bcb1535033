//! Binance adapter configuration.

use std::fmt;
use std::time::Duration;

/// Binance USDⓈ-M futures environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinanceEnvironment {
    /// Futures testnet (simulated balances).
    Testnet,
    /// Production (real money).
    Live,
}

impl BinanceEnvironment {
    /// Get the REST base URL.
    #[must_use]
    pub const fn base_url(&self) -> &'static str {
        match self {
            Self::Testnet => "https://testnet.binancefuture.com",
            Self::Live => "https://fapi.binance.com",
        }
    }

    /// Check if this is live trading.
    #[must_use]
    pub const fn is_live(&self) -> bool {
        matches!(self, Self::Live)
    }

    /// Parse `TESTNET` / `LIVE` (case-insensitive).
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_uppercase().as_str() {
            "TESTNET" => Some(Self::Testnet),
            "LIVE" => Some(Self::Live),
            _ => None,
        }
    }
}

impl fmt::Display for BinanceEnvironment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Testnet => write!(f, "TESTNET"),
            Self::Live => write!(f, "LIVE"),
        }
    }
}

/// Configuration for the Binance exchange adapter.
#[derive(Clone)]
pub struct BinanceConfig {
    /// API key, sent as `X-MBX-APIKEY`.
    pub api_key: String,
    /// API secret used for signing; never sent or logged.
    pub api_secret: String,
    /// Trading environment.
    pub environment: BinanceEnvironment,
    /// Base URL override (tests point this at a local server).
    pub base_url: Option<String>,
    /// HTTP request timeout.
    pub timeout: Duration,
    /// `recvWindow` sent with signed requests.
    pub recv_window: Duration,
    /// Retry policy for idempotent requests.
    pub retry: RetryConfig,
}

impl BinanceConfig {
    /// Create a new configuration with default timeouts.
    #[must_use]
    pub fn new(api_key: String, api_secret: String, environment: BinanceEnvironment) -> Self {
        Self {
            api_key,
            api_secret,
            environment,
            base_url: None,
            timeout: Duration::from_millis(300),
            recv_window: Duration::from_millis(5000),
            retry: RetryConfig::default(),
        }
    }

    /// Override the base URL.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Set the HTTP timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the receive window.
    #[must_use]
    pub const fn with_recv_window(mut self, recv_window: Duration) -> Self {
        self.recv_window = recv_window;
        self
    }

    /// Set the retry configuration.
    #[must_use]
    pub const fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Effective REST base URL.
    #[must_use]
    pub fn base_url(&self) -> &str {
        self.base_url
            .as_deref()
            .unwrap_or_else(|| self.environment.base_url())
    }
}

impl fmt::Debug for BinanceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BinanceConfig")
            .field("api_key", &"<redacted>")
            .field("api_secret", &"<redacted>")
            .field("environment", &self.environment)
            .field("base_url", &self.base_url())
            .field("timeout", &self.timeout)
            .field("recv_window", &self.recv_window)
            .field("retry", &self.retry)
            .finish()
    }
}

/// Retry configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Maximum number of attempts, including the first.
    pub max_attempts: u32,
    /// Initial backoff duration.
    pub initial_backoff: Duration,
    /// Maximum backoff duration.
    pub max_backoff: Duration,
    /// Backoff multiplier.
    pub multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(50),
            max_backoff: Duration::from_secs(1),
            multiplier: 2.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn testnet_environment_urls() {
        let env = BinanceEnvironment::Testnet;
        assert!(env.base_url().contains("testnet"));
        assert!(!env.is_live());
    }

    #[test]
    fn live_environment_urls() {
        let env = BinanceEnvironment::Live;
        assert_eq!(env.base_url(), "https://fapi.binance.com");
        assert!(env.is_live());
    }

    #[test]
    fn parse_environment() {
        assert_eq!(BinanceEnvironment::parse("testnet"), Some(BinanceEnvironment::Testnet));
        assert_eq!(BinanceEnvironment::parse("LIVE"), Some(BinanceEnvironment::Live));
        assert_eq!(BinanceEnvironment::parse("PAPER"), None);
    }

    #[test]
    fn config_defaults() {
        let config = BinanceConfig::new(
            "key".to_string(),
            "secret".to_string(),
            BinanceEnvironment::Testnet,
        );
        assert_eq!(config.timeout, Duration::from_millis(300));
        assert_eq!(config.recv_window, Duration::from_millis(5000));
        assert_eq!(config.base_url(), "https://testnet.binancefuture.com");
    }

    #[test]
    fn base_url_override() {
        let config = BinanceConfig::new(
            "key".to_string(),
            "secret".to_string(),
            BinanceEnvironment::Live,
        )
        .with_base_url("http://127.0.0.1:9999");
        assert_eq!(config.base_url(), "http://127.0.0.1:9999");
    }

    #[test]
    fn debug_redacts_credentials() {
        let config = BinanceConfig::new(
            "my-api-key".to_string(),
            "my-api-secret".to_string(),
            BinanceEnvironment::Testnet,
        );
        let debug = format!("{config:?}");
        assert!(!debug.contains("my-api-key"));
        assert!(!debug.contains("my-api-secret"));
        assert!(debug.contains("<redacted>"));
    }

    #[test]
    fn environment_display() {
        assert_eq!(BinanceEnvironment::Testnet.to_string(), "TESTNET");
        assert_eq!(BinanceEnvironment::Live.to_string(), "LIVE");
    }
}
