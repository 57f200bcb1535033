//! Order execution errors.

use std::fmt;

use super::value_objects::OrderStatus;

/// Errors that can occur in order execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderError {
    /// Invalid state transition attempted.
    InvalidStateTransition {
        /// Current order status.
        from: OrderStatus,
        /// Attempted status.
        to: OrderStatus,
        /// Reason for failure.
        reason: String,
    },

    /// Order cannot be filled in current state.
    CannotFill {
        /// Current status.
        status: OrderStatus,
    },

    /// Order cannot be canceled in current state.
    CannotCancel {
        /// Current status.
        status: OrderStatus,
    },

    /// Fill quantity exceeds remaining quantity.
    FillExceedsRemaining {
        /// Fill quantity attempted.
        fill_qty: String,
        /// Remaining quantity.
        remaining_qty: String,
    },

    /// Fill carries a non-positive price or quantity, or targets another order.
    InvalidFill {
        /// Why the fill was refused.
        reason: String,
    },

    /// Invalid order parameters.
    InvalidParameters {
        /// Field with invalid value.
        field: String,
        /// Error message.
        message: String,
    },
}

impl fmt::Display for OrderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidStateTransition { from, to, reason } => {
                write!(
                    f,
                    "Invalid order state transition: {from} -> {to}: {reason}"
                )
            }
            Self::CannotFill { status } => {
                write!(f, "Cannot fill order in status: {status}")
            }
            Self::CannotCancel { status } => {
                write!(f, "Cannot cancel order in status: {status}")
            }
            Self::FillExceedsRemaining {
                fill_qty,
                remaining_qty,
            } => {
                write!(
                    f,
                    "Fill quantity {fill_qty} exceeds remaining {remaining_qty}"
                )
            }
            Self::InvalidFill { reason } => write!(f, "Invalid fill: {reason}"),
            Self::InvalidParameters { field, message } => {
                write!(f, "Invalid order parameter '{field}': {message}")
            }
        }
    }
}

impl std::error::Error for OrderError {}
