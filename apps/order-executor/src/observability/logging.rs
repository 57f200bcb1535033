//! Structured logging setup.
//!
//! Installs a `tracing-subscriber` formatter driven by `RUST_LOG`, falling
//! back to the configured level for this crate.

use tracing_subscriber::EnvFilter;

use crate::config::{LogFormat, LoggingSettings};

/// Error type for tracing operations.
#[derive(Debug, thiserror::Error)]
pub enum TracingError {
    /// The configured filter directive does not parse.
    #[error("invalid log filter '{directive}': {message}")]
    InvalidFilter {
        /// Offending directive.
        directive: String,
        /// Parser message.
        message: String,
    },
    /// A global subscriber is already installed.
    #[error("failed to initialize tracing subscriber: {0}")]
    SubscriberError(String),
}

/// Build the env filter: `RUST_LOG` wins, else `order_executor=<level>`.
///
/// # Errors
///
/// Returns error if the fallback directive does not parse.
pub fn env_filter(settings: &LoggingSettings) -> Result<EnvFilter, TracingError> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }

    let directive = format!("order_executor={}", settings.level);
    EnvFilter::try_new(&directive).map_err(|e| TracingError::InvalidFilter {
        directive,
        message: e.to_string(),
    })
}

/// Install the global tracing subscriber.
///
/// # Errors
///
/// Returns error if the filter is invalid or a subscriber is already set.
pub fn init_tracing(settings: &LoggingSettings) -> Result<(), TracingError> {
    let filter = env_filter(settings)?;
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    let result = match settings.format {
        LogFormat::Json => builder.json().with_current_span(false).try_init(),
        LogFormat::Pretty => builder.try_init(),
    };

    result.map_err(|e| TracingError::SubscriberError(e.to_string()))
}
