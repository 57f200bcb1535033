//! Configuration module for the order executor.
//!
//! Provides configuration loading, validation, and environment variable
//! interpolation for all order executor components. Exchange credentials are
//! read from the environment only (see [`ExchangeCredentials`]).
//!
//! # Usage
//!
//! ```rust,ignore
//! use order_executor::config::{Config, load_config};
//!
//! // Load from ORDER_EXECUTOR_CONFIG or config.yaml
//! let config = load_config(None)?;
//!
//! // Load from custom path
//! let config = load_config(Some("custom/config.yaml"))?;
//!
//! println!("state TTL: {:?}", config.state_store.ttl());
//! ```

mod circuit_breaker;
mod credentials;
mod events;
mod exchange;
mod observability;
mod rate_limits;
mod state_store;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::risk_management::RiskLimits;

pub use circuit_breaker::{CircuitBreakerConfig, CircuitBreakerSettings};
pub use credentials::{API_KEY_ENV, API_SECRET_ENV, ExchangeCredentials};
pub use events::EventsSettings;
pub use exchange::{ExchangeSettings, RetrySettings};
pub use observability::{LogFormat, LoggingSettings, MetricsSettings, ObservabilityConfig};
pub use rate_limits::{RateLimitConfig, TierSettings};
pub use state_store::StateStoreSettings;

/// Environment variable overriding the config file path.
pub const CONFIG_PATH_ENV: &str = "ORDER_EXECUTOR_CONFIG";

/// Config file used when no path is given.
pub const DEFAULT_CONFIG_PATH: &str = "config.yaml";

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("Failed to read config file '{path}': {source}")]
    ReadError {
        /// Path to the config file.
        path: String,
        /// The underlying IO error.
        source: std::io::Error,
    },

    /// Failed to parse YAML configuration.
    #[error("Failed to parse config YAML: {0}")]
    ParseError(#[from] serde_yaml_bw::Error),

    /// Configuration validation failed.
    #[error("Config validation failed: {0}")]
    ValidationError(String),

    /// Missing required environment variable.
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),
}

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Exchange connection settings.
    #[serde(default)]
    pub exchange: ExchangeSettings,
    /// Rate limiter tiers.
    #[serde(default)]
    pub rate_limits: RateLimitConfig,
    /// Circuit breaker configuration.
    #[serde(default)]
    pub circuit_breaker: CircuitBreakerConfig,
    /// Pre-trade risk limits.
    #[serde(default)]
    pub risk: RiskLimits,
    /// State store configuration.
    #[serde(default)]
    pub state_store: StateStoreSettings,
    /// Order update bus configuration.
    #[serde(default)]
    pub events: EventsSettings,
    /// Observability configuration.
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

// ============================================
// Configuration Loading
// ============================================

/// Config path: `ORDER_EXECUTOR_CONFIG` when set, else `config.yaml`.
#[must_use]
pub fn config_path_from_env() -> String {
    std::env::var(CONFIG_PATH_ENV)
        .ok()
        .filter(|path| !path.is_empty())
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string())
}

/// Load configuration from a YAML file with environment variable interpolation.
///
/// # Arguments
///
/// * `path` - Optional path to the config file. Defaults to
///   `ORDER_EXECUTOR_CONFIG`, then `config.yaml`.
///
/// # Errors
///
/// Returns a `ConfigError` if the file cannot be read, parsed, or validated.
pub fn load_config(path: Option<&str>) -> Result<Config, ConfigError> {
    let path = path.map_or_else(config_path_from_env, str::to_string);

    let contents = std::fs::read_to_string(&path).map_err(|e| ConfigError::ReadError {
        path: path.clone(),
        source: e,
    })?;

    load_config_from_string(&contents)
}

/// Load configuration from a YAML string (useful for testing).
///
/// # Errors
///
/// Returns a `ConfigError` if the YAML cannot be parsed or validated.
pub fn load_config_from_string(yaml: &str) -> Result<Config, ConfigError> {
    let interpolated = interpolate_env_vars(yaml);
    let config: Config = if interpolated.trim().is_empty() {
        Config::default()
    } else {
        serde_yaml_bw::from_str(&interpolated)?
    };
    validate_config(&config)?;
    Ok(config)
}

/// Interpolate environment variables in a string.
///
/// Supports both `${VAR}` and `${VAR:-default}` syntax.
#[allow(clippy::expect_used)] // Regex is compile-time constant; expect() is safe here
fn interpolate_env_vars(input: &str) -> String {
    use std::sync::OnceLock;

    static ENV_VAR_REGEX: OnceLock<regex::Regex> = OnceLock::new();

    let mut result = input.to_string();

    let re = ENV_VAR_REGEX.get_or_init(|| {
        regex::Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)(?::-([^}]*))?\}")
            .expect("env var regex is valid")
    });

    for cap in re.captures_iter(input) {
        let Some(full_match) = cap.get(0) else {
            continue;
        };
        let Some(var_match) = cap.get(1) else {
            continue;
        };
        let full_match = full_match.as_str();
        let var_name = var_match.as_str();
        let default_value = cap.get(2).map(|m| m.as_str());

        let value = match std::env::var(var_name) {
            Ok(v) if !v.is_empty() => v,
            _ => default_value.map_or_else(String::new, str::to_string),
        };

        result = result.replace(full_match, &value);
    }

    result
}

/// Validate configuration values.
fn validate_config(config: &Config) -> Result<(), ConfigError> {
    // Exchange
    config.exchange.environment()?;

    if config.exchange.timeout_ms == 0 {
        return Err(ConfigError::ValidationError(
            "exchange.timeout_ms must be positive".to_string(),
        ));
    }

    let retry = &config.exchange.retry;
    if retry.max_attempts == 0 {
        return Err(ConfigError::ValidationError(
            "exchange.retry.max_attempts must be at least 1".to_string(),
        ));
    }
    if retry.multiplier < 1.0 {
        return Err(ConfigError::ValidationError(
            "exchange.retry.multiplier must be at least 1.0".to_string(),
        ));
    }

    // Rate limits
    for (key, tier) in config.rate_limits.all_tiers() {
        if tier.capacity == 0 || tier.window_ms == 0 {
            return Err(ConfigError::ValidationError(format!(
                "rate_limits tier '{}' ({}) must have positive capacity and window_ms",
                tier.name,
                key.unwrap_or("default")
            )));
        }
    }

    // Circuit breakers
    for (key, cb) in config.circuit_breaker.all_settings() {
        if cb.failure_rate_threshold <= 0.0 || cb.failure_rate_threshold > 1.0 {
            return Err(ConfigError::ValidationError(format!(
                "circuit_breaker.{key}.failure_rate_threshold must be in (0.0, 1.0]"
            )));
        }
        if cb.sliding_window_size == 0 || cb.permitted_calls_in_half_open == 0 {
            return Err(ConfigError::ValidationError(format!(
                "circuit_breaker.{key} window and half-open calls must be positive"
            )));
        }
    }

    // Risk
    let risk = &config.risk;
    if risk.max_order_value <= rust_decimal::Decimal::ZERO
        || risk.max_position_size <= rust_decimal::Decimal::ZERO
    {
        return Err(ConfigError::ValidationError(
            "risk.max_order_value and risk.max_position_size must be positive".to_string(),
        ));
    }
    if risk.price_band_pct <= rust_decimal::Decimal::ZERO
        || risk.price_band_pct > rust_decimal::Decimal::ONE
    {
        return Err(ConfigError::ValidationError(
            "risk.price_band_pct must be in (0, 1]".to_string(),
        ));
    }

    // State store and events
    if config.state_store.ttl_secs == 0 {
        return Err(ConfigError::ValidationError(
            "state_store.ttl_secs must be positive".to_string(),
        ));
    }
    if config.events.capacity == 0 {
        return Err(ConfigError::ValidationError(
            "events.capacity must be positive".to_string(),
        ));
    }

    // Observability
    if config.observability.metrics.enabled {
        config.observability.metrics.listen_addr()?;
    }

    Ok(())
}
