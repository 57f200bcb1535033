//! Error taxonomy for executor operations.
//!
//! | Variant | Caller action |
//! |---------|---------------|
//! | `Validation` | Fix the request; never retried |
//! | `RateLimitExceeded` | Back off and retry |
//! | `CircuitOpen` | Back off until the endpoint recovers |
//! | `Exchange` | Business rejection, surfaced verbatim |
//! | `Transient` | Outcome unknown; re-query before acting |
//! | `Conflict` | State machine refused the operation |
//! | `NotFound` | Order unknown to both state tiers |

use thiserror::Error;

use crate::application::ports::{ExchangeError, ExchangeErrorKind};
use crate::domain::order_execution::OrderError;
use crate::domain::risk_management::ValidationFailure;
use crate::domain::shared::OrderId;

/// Error returned by executor operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExecutionError {
    /// Order failed pre-trade validation.
    #[error("Validation failed ({kind}): {message}")]
    Validation {
        /// Failure category (`symbol`, `quantity`, `price`, `notional`, `risk`, `time_in_force`).
        kind: &'static str,
        /// Failure detail.
        message: String,
        /// The persisted `REJECTED` order, when one was recorded.
        order_id: Option<OrderId>,
    },

    /// Admission refused by the rate limiter.
    #[error("Rate limit exceeded for {key}")]
    RateLimitExceeded {
        /// Limiter key.
        key: String,
    },

    /// Admission refused by an open circuit breaker.
    #[error("Circuit breaker open for {name}")]
    CircuitOpen {
        /// Breaker key.
        name: String,
    },

    /// Exchange-reported business error.
    #[error("Exchange error [{code}] {kind}: {message}")]
    Exchange {
        /// Exchange error code.
        code: i64,
        /// Mapped category.
        kind: ExchangeErrorKind,
        /// Exchange message, verbatim.
        message: String,
        /// The order marked `REJECTED`, for create.
        order_id: Option<OrderId>,
    },

    /// Network, timeout or storage failure with unknown outcome.
    #[error("Transient failure: {message}")]
    Transient {
        /// Failure detail.
        message: String,
        /// The affected order, when known.
        order_id: Option<OrderId>,
    },

    /// State machine violation.
    #[error("Conflict: {message}")]
    Conflict {
        /// Failure detail.
        message: String,
    },

    /// Order not found in any state tier.
    #[error("Order not found: {order_id}")]
    NotFound {
        /// Requested order ID.
        order_id: String,
    },
}

impl ExecutionError {
    /// True if retrying the same call later may succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::RateLimitExceeded { .. } | Self::CircuitOpen { .. } | Self::Transient { .. }
        )
    }

    /// Order recorded by the failing operation, if any.
    #[must_use]
    pub const fn order_id(&self) -> Option<&OrderId> {
        match self {
            Self::Validation { order_id, .. }
            | Self::Exchange { order_id, .. }
            | Self::Transient { order_id, .. } => order_id.as_ref(),
            _ => None,
        }
    }

    /// Short label for metrics and logs.
    #[must_use]
    pub const fn reason(&self) -> &'static str {
        match self {
            Self::Validation { kind, .. } => kind,
            Self::RateLimitExceeded { .. } => "rate_limited",
            Self::CircuitOpen { .. } => "circuit_open",
            Self::Exchange { kind, .. } => kind.as_str(),
            Self::Transient { .. } => "transient",
            Self::Conflict { .. } => "conflict",
            Self::NotFound { .. } => "not_found",
        }
    }

    /// Validation failure attached to the rejected order.
    #[must_use]
    pub fn validation(failure: &ValidationFailure, order_id: Option<OrderId>) -> Self {
        Self::Validation {
            kind: failure.kind(),
            message: failure.to_string(),
            order_id,
        }
    }

    /// Exchange failure, optionally attached to an order.
    #[must_use]
    pub fn from_exchange(err: ExchangeError, order_id: Option<OrderId>) -> Self {
        match err {
            ExchangeError::Api {
                kind,
                code,
                message,
            } => Self::Exchange {
                code,
                kind,
                message,
                order_id,
            },
            ExchangeError::Transient { message } | ExchangeError::Decode { message } => {
                Self::Transient { message, order_id }
            }
        }
    }

    /// Order not found.
    pub fn not_found(order_id: impl ToString) -> Self {
        Self::NotFound {
            order_id: order_id.to_string(),
        }
    }
}

impl From<OrderError> for ExecutionError {
    fn from(err: OrderError) -> Self {
        Self::Conflict {
            message: err.to_string(),
        }
    }
}
