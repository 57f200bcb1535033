//! Order DTOs

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::order_execution::aggregate::{CreateOrderCommand, Order};
use crate::domain::order_execution::events::OrderUpdate;
use crate::domain::order_execution::value_objects::{
    OrderSide, OrderStatus, OrderType, TimeInForce,
};
use crate::domain::shared::{ClientOrderId, OrderId, Symbol, Timestamp};

/// DTO for creating an order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateOrderDto {
    /// Optional caller reference.
    #[serde(default)]
    pub client_order_id: Option<String>,
    /// Symbol.
    pub symbol: String,
    /// Side.
    pub side: OrderSide,
    /// Type.
    pub order_type: OrderType,
    /// Quantity.
    pub quantity: Decimal,
    /// Limit price.
    #[serde(default)]
    pub price: Option<Decimal>,
    /// Time in force; defaulted per order type when absent.
    #[serde(default)]
    pub time_in_force: Option<TimeInForce>,
    /// Post-only flag.
    #[serde(default)]
    pub post_only: bool,
    /// Reduce-only flag.
    #[serde(default)]
    pub reduce_only: bool,
}

impl CreateOrderDto {
    /// Convert to a domain command.
    ///
    /// A missing time in force becomes GTX for post-only orders, GTC for
    /// limit orders and stays empty for market orders. An explicit value is
    /// passed through for the validator to judge.
    #[must_use]
    pub fn into_command(self) -> CreateOrderCommand {
        let post_only = self.post_only || matches!(self.order_type, OrderType::PostOnly);
        let time_in_force = self.time_in_force.or(match self.order_type {
            OrderType::Market => None,
            OrderType::Limit | OrderType::PostOnly if post_only => Some(TimeInForce::Gtx),
            OrderType::Limit | OrderType::PostOnly => Some(TimeInForce::Gtc),
        });

        CreateOrderCommand {
            client_order_id: self.client_order_id.map(ClientOrderId::new),
            symbol: Symbol::new(self.symbol),
            side: self.side,
            order_type: self.order_type,
            quantity: self.quantity,
            price: self.price,
            time_in_force,
            post_only: self.post_only,
            reduce_only: self.reduce_only,
        }
    }
}

/// DTO representing an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderDto {
    /// Order ID.
    pub order_id: String,
    /// Client order ID.
    pub client_order_id: String,
    /// Exchange order ID.
    pub exchange_order_id: Option<String>,
    /// Symbol.
    pub symbol: String,
    /// Side.
    pub side: OrderSide,
    /// Type.
    pub order_type: OrderType,
    /// Quantity.
    pub quantity: Decimal,
    /// Price.
    pub price: Option<Decimal>,
    /// Time in force.
    pub time_in_force: Option<TimeInForce>,
    /// Status.
    pub status: OrderStatus,
    /// Filled quantity.
    pub filled_quantity: Decimal,
    /// Average fill price.
    pub avg_fill_price: Decimal,
    /// Rejection reason.
    pub reject_reason: Option<String>,
    /// Created at.
    pub created_at: Timestamp,
    /// Updated at.
    pub updated_at: Timestamp,
}

impl From<&Order> for OrderDto {
    fn from(order: &Order) -> Self {
        Self {
            order_id: order.id().to_string(),
            client_order_id: order.client_order_id().to_string(),
            exchange_order_id: order.exchange_order_id().map(ToString::to_string),
            symbol: order.symbol().to_string(),
            side: order.side(),
            order_type: order.order_type(),
            quantity: order.quantity(),
            price: order.price(),
            time_in_force: order.time_in_force(),
            status: order.status(),
            filled_quantity: order.filled_quantity(),
            avg_fill_price: order.avg_fill_price(),
            reject_reason: order.reject_reason().map(ToString::to_string),
            created_at: order.created_at(),
            updated_at: order.updated_at(),
        }
    }
}

/// Filter for `StreamOrderUpdates`. Empty fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderUpdateFilter {
    /// Only updates for this symbol.
    #[serde(default)]
    pub symbol: Option<Symbol>,
    /// Only updates for this order.
    #[serde(default)]
    pub order_id: Option<OrderId>,
}

impl OrderUpdateFilter {
    /// Match every update.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Match updates for one symbol.
    #[must_use]
    pub fn for_symbol(symbol: impl Into<Symbol>) -> Self {
        Self {
            symbol: Some(symbol.into()),
            order_id: None,
        }
    }

    /// Match updates for one order.
    #[must_use]
    pub fn for_order(order_id: OrderId) -> Self {
        Self {
            symbol: None,
            order_id: Some(order_id),
        }
    }

    /// True if `update` passes the filter.
    #[must_use]
    pub fn matches(&self, update: &OrderUpdate) -> bool {
        self.symbol.as_ref().is_none_or(|s| s == update.symbol())
            && self.order_id.as_ref().is_none_or(|id| id == update.order_id())
    }
}
