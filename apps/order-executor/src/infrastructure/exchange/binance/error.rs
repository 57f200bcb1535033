//! Binance-specific error types and the error code table.

use thiserror::Error;

use crate::application::ports::{ExchangeError, ExchangeErrorKind};

/// Errors from the Binance adapter.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BinanceError {
    /// Well-formed error body (`{"code": -2019, "msg": "..."}`).
    #[error("API error: {code} - {message}")]
    Api {
        /// Exchange error code.
        code: i64,
        /// Exchange message.
        message: String,
        /// HTTP status of the response.
        status: u16,
    },

    /// Request weight or order rate exceeded without an error body.
    #[error("Rate limited (HTTP {status})")]
    RateLimited {
        /// HTTP status (429 or 418).
        status: u16,
    },

    /// Upstream 5xx.
    #[error("Server error (HTTP {status}): {message}")]
    Server {
        /// HTTP status.
        status: u16,
        /// Response body.
        message: String,
    },

    /// Non-success status with an unparseable body.
    #[error("Unexpected response (HTTP {status}): {message}")]
    UnexpectedStatus {
        /// HTTP status.
        status: u16,
        /// Response body.
        message: String,
    },

    /// Timeout, connection reset or other transport failure.
    #[error("Network error: {0}")]
    Network(String),

    /// JSON parsing error.
    #[error("JSON parsing error: {0}")]
    JsonParse(String),

    /// Missing API key or secret.
    #[error("Authentication failed: credentials missing")]
    MissingCredentials,

    /// Max retries exceeded.
    #[error("Max retries exceeded after {attempts} attempts: {last_error}")]
    MaxRetriesExceeded {
        /// Number of attempts made before giving up.
        attempts: u32,
        /// Last failure seen.
        last_error: String,
    },
}

impl BinanceError {
    /// True for failures with an unknown outcome.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Network(_) | Self::Server { .. } | Self::MaxRetriesExceeded { .. }
        )
    }
}

/// Map a Binance error code to its internal category.
#[must_use]
pub const fn error_kind(code: i64) -> ExchangeErrorKind {
    match code {
        -2010 | -2019 | -4131 => ExchangeErrorKind::InsufficientBalance,
        -1121 | -4140 => ExchangeErrorKind::InvalidSymbol,
        -1003 | -1015 => ExchangeErrorKind::RateLimited,
        -2011 | -2013 => ExchangeErrorKind::UnknownOrder,
        _ => ExchangeErrorKind::Unknown,
    }
}

impl From<BinanceError> for ExchangeError {
    fn from(err: BinanceError) -> Self {
        match err {
            BinanceError::Api { code, message, .. } => Self::Api {
                kind: error_kind(code),
                code,
                message,
            },
            BinanceError::RateLimited { status } => Self::Api {
                kind: ExchangeErrorKind::RateLimited,
                code: i64::from(status),
                message: format!("HTTP {status}"),
            },
            BinanceError::UnexpectedStatus { status, message } => Self::Api {
                kind: ExchangeErrorKind::Unknown,
                code: i64::from(status),
                message,
            },
            BinanceError::MissingCredentials => Self::Api {
                kind: ExchangeErrorKind::Unknown,
                code: 401,
                message: "credentials missing".to_string(),
            },
            BinanceError::Server { .. }
            | BinanceError::Network(_)
            | BinanceError::MaxRetriesExceeded { .. } => Self::Transient {
                message: err.to_string(),
            },
            BinanceError::JsonParse(message) => Self::Decode { message },
        }
    }
}
