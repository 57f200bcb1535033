//! Order status in the lifecycle.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Order status.
///
/// ```text
/// NEW ──► SUBMITTED ──► PARTIALLY_FILLED ──► FILLED
///  │          │                │
///  │          └──────┬─────────┘
///  ▼                 ▼
/// REJECTED        CANCELED
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    /// Order created locally, not yet acknowledged by the exchange.
    New,
    /// Order acknowledged by the exchange.
    Submitted,
    /// Order partially filled.
    PartiallyFilled,
    /// Order completely filled.
    Filled,
    /// Order canceled.
    Canceled,
    /// Order rejected by validation or by the exchange.
    Rejected,
}

impl OrderStatus {
    /// Returns true if the order is in a terminal state.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Filled | Self::Canceled | Self::Rejected)
    }

    /// Returns true if the order is resting at the exchange.
    #[must_use]
    pub const fn is_open(&self) -> bool {
        matches!(self, Self::Submitted | Self::PartiallyFilled)
    }

    /// Returns true if the order can be canceled.
    #[must_use]
    pub const fn is_cancelable(&self) -> bool {
        matches!(self, Self::Submitted | Self::PartiallyFilled)
    }

    /// Returns true if the order can receive fills.
    #[must_use]
    pub const fn can_fill(&self) -> bool {
        matches!(self, Self::Submitted | Self::PartiallyFilled)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::New => write!(f, "NEW"),
            Self::Submitted => write!(f, "SUBMITTED"),
            Self::PartiallyFilled => write!(f, "PARTIALLY_FILLED"),
            Self::Filled => write!(f, "FILLED"),
            Self::Canceled => write!(f, "CANCELED"),
            Self::Rejected => write!(f, "REJECTED"),
        }
    }
}
