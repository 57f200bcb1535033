//! Order types supported by the executor.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Order type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderType {
    /// Execute immediately at the best available price.
    Market,
    /// Rest on the book at the limit price or better.
    Limit,
    /// Limit order that must add liquidity (rejected if it would cross).
    PostOnly,
}

impl OrderType {
    /// Returns true if this order type requires a price.
    #[must_use]
    pub const fn requires_price(&self) -> bool {
        matches!(self, Self::Limit | Self::PostOnly)
    }

    /// Returns true for market orders.
    #[must_use]
    pub const fn is_market(&self) -> bool {
        matches!(self, Self::Market)
    }
}

impl fmt::Display for OrderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Market => write!(f, "MARKET"),
            Self::Limit => write!(f, "LIMIT"),
            Self::PostOnly => write!(f, "POST_ONLY"),
        }
    }
}
