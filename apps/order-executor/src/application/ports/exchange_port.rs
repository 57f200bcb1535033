//! Exchange Port (Driven Port)
//!
//! Interface for the signed REST exchange adapter. Implementations are
//! stateless protocol adapters with no knowledge of the order state machine.

use std::fmt;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::order_execution::aggregate::Order;
use crate::domain::order_execution::value_objects::{
    OrderSide, OrderStatus, OrderType, TimeInForce,
};
use crate::domain::risk_management::SymbolRule;
use crate::domain::shared::{ClientOrderId, ExchangeOrderId, Symbol, Timestamp};
use crate::resilience::BreakerFailure;

/// Request to place a new order on the exchange.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaceOrderRequest {
    /// Client order ID sent as the exchange-side reference.
    pub client_order_id: ClientOrderId,
    /// Symbol to trade.
    pub symbol: Symbol,
    /// Order side.
    pub side: OrderSide,
    /// Order type.
    pub order_type: OrderType,
    /// Quantity.
    pub quantity: Decimal,
    /// Limit price (for limit and post-only orders).
    pub price: Option<Decimal>,
    /// Time in force; `None` for market orders.
    pub time_in_force: Option<TimeInForce>,
    /// Post-only flag.
    pub post_only: bool,
    /// Reduce-only flag.
    pub reduce_only: bool,
}

impl PlaceOrderRequest {
    /// Build the request for a validated order.
    #[must_use]
    pub fn from_order(order: &Order) -> Self {
        Self {
            client_order_id: order.client_order_id().clone(),
            symbol: order.symbol().clone(),
            side: order.side(),
            order_type: order.order_type(),
            quantity: order.quantity(),
            price: order.price(),
            time_in_force: order.time_in_force(),
            post_only: order.is_post_only(),
            reduce_only: order.reduce_only(),
        }
    }
}

/// Order status as reported by the exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExchangeOrderStatus {
    /// Accepted and resting.
    New,
    /// Partially filled.
    PartiallyFilled,
    /// Completely filled.
    Filled,
    /// Canceled.
    Canceled,
    /// Rejected by the matching engine.
    Rejected,
    /// Expired (IOC remainder, GTX that would cross).
    Expired,
}

impl ExchangeOrderStatus {
    /// Local lifecycle status for this exchange status.
    #[must_use]
    pub const fn to_order_status(self) -> OrderStatus {
        match self {
            Self::New => OrderStatus::Submitted,
            Self::PartiallyFilled => OrderStatus::PartiallyFilled,
            Self::Filled => OrderStatus::Filled,
            Self::Canceled | Self::Expired => OrderStatus::Canceled,
            Self::Rejected => OrderStatus::Rejected,
        }
    }
}

/// Exchange view of an order, returned by create, cancel and query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExchangeOrder {
    /// Exchange-assigned order ID.
    pub exchange_order_id: ExchangeOrderId,
    /// Client order ID echoed back.
    pub client_order_id: ClientOrderId,
    /// Symbol.
    pub symbol: Symbol,
    /// Exchange status.
    pub status: ExchangeOrderStatus,
    /// Quantity executed so far.
    pub executed_qty: Decimal,
    /// Average execution price, if anything executed.
    pub avg_price: Option<Decimal>,
    /// Last update time reported by the exchange.
    pub update_time: Timestamp,
}

/// Identifies an order on the exchange for cancel and query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExchangeOrderRef {
    /// Symbol the order trades.
    pub symbol: Symbol,
    /// Exchange order ID, preferred when known.
    pub exchange_order_id: Option<ExchangeOrderId>,
    /// Client order ID fallback.
    pub client_order_id: ClientOrderId,
}

impl ExchangeOrderRef {
    /// Reference for a local order.
    #[must_use]
    pub fn for_order(order: &Order) -> Self {
        Self {
            symbol: order.symbol().clone(),
            exchange_order_id: order.exchange_order_id().cloned(),
            client_order_id: order.client_order_id().clone(),
        }
    }
}

/// Category of an exchange-reported error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExchangeErrorKind {
    /// Margin or balance insufficient for the order.
    InsufficientBalance,
    /// Symbol unknown or closed on the exchange.
    InvalidSymbol,
    /// Upstream request weight or order rate exceeded.
    RateLimited,
    /// Order unknown to the exchange (already closed or never placed).
    UnknownOrder,
    /// Any other exchange error.
    Unknown,
}

impl ExchangeErrorKind {
    /// Snake-case label for logs and metrics.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::InsufficientBalance => "insufficient_balance",
            Self::InvalidSymbol => "invalid_symbol",
            Self::RateLimited => "rate_limited",
            Self::UnknownOrder => "unknown_order",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ExchangeErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Exchange port error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExchangeError {
    /// Well-formed error response from the exchange.
    #[error("Exchange error [{code}] {kind}: {message}")]
    Api {
        /// Mapped category.
        kind: ExchangeErrorKind,
        /// Exchange error code (or HTTP status when the body carried none).
        code: i64,
        /// Exchange message, verbatim.
        message: String,
    },

    /// Transport failure or upstream outage; the outcome is unknown.
    #[error("Transient exchange failure: {message}")]
    Transient {
        /// Error details.
        message: String,
    },

    /// Response could not be decoded.
    #[error("Malformed exchange response: {message}")]
    Decode {
        /// Error details.
        message: String,
    },
}

impl ExchangeError {
    /// Create a transient error.
    pub fn transient(message: impl Into<String>) -> Self {
        Self::Transient {
            message: message.into(),
        }
    }

    /// Label for metrics.
    #[must_use]
    pub const fn kind_label(&self) -> &'static str {
        match self {
            Self::Api { kind, .. } => kind.as_str(),
            Self::Transient { .. } => "transient",
            Self::Decode { .. } => "decode",
        }
    }

    /// True if the error carries an unknown outcome worth retrying for idempotent calls.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Transient { .. })
    }
}

impl BreakerFailure for ExchangeError {
    fn is_breaker_failure(&self) -> bool {
        match self {
            Self::Transient { .. } => true,
            Self::Api { kind, .. } => matches!(kind, ExchangeErrorKind::RateLimited),
            Self::Decode { .. } => false,
        }
    }
}

/// Port for exchange interactions.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ExchangePort: Send + Sync {
    /// Place a new order.
    async fn create_order(&self, request: &PlaceOrderRequest)
    -> Result<ExchangeOrder, ExchangeError>;

    /// Cancel an open order.
    async fn cancel_order(&self, order: &ExchangeOrderRef) -> Result<ExchangeOrder, ExchangeError>;

    /// Query the exchange's view of an order.
    async fn query_order(&self, order: &ExchangeOrderRef) -> Result<ExchangeOrder, ExchangeError>;

    /// Pull trading rules for every listed symbol.
    async fn get_exchange_info(&self) -> Result<Vec<SymbolRule>, ExchangeError>;
}
