//! Domain events for order execution.
//!
//! Every state transition yields an `OrderUpdate` carrying a full snapshot of
//! the order, which is what the event bus and update streams deliver.

use serde::{Deserialize, Serialize};

use super::aggregate::Order;
use crate::domain::shared::{OrderId, Symbol, Timestamp};

/// Subject prefix for order update topics.
pub const ORDER_UPDATES_TOPIC_PREFIX: &str = "orders.updates";

/// Kind of change an update describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UpdateType {
    /// Order accepted by the exchange.
    Created,
    /// Order partially filled.
    Updated,
    /// Order completely filled.
    Filled,
    /// Order canceled.
    Canceled,
    /// Order rejected by validation or by the exchange.
    Rejected,
}

impl UpdateType {
    /// Get the event type name.
    #[must_use]
    pub const fn event_type(&self) -> &'static str {
        match self {
            Self::Created => "ORDER_CREATED",
            Self::Updated => "ORDER_UPDATED",
            Self::Filled => "ORDER_FILLED",
            Self::Canceled => "ORDER_CANCELED",
            Self::Rejected => "ORDER_REJECTED",
        }
    }
}

/// Order update event with the order snapshot after the transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderUpdate {
    /// Order state after the transition.
    pub order: Order,
    /// What changed.
    pub update_type: UpdateType,
    /// When the transition happened.
    pub timestamp: Timestamp,
}

impl OrderUpdate {
    /// Get the order ID for this event.
    #[must_use]
    pub const fn order_id(&self) -> &OrderId {
        self.order.id()
    }

    /// Get the symbol for this event.
    #[must_use]
    pub const fn symbol(&self) -> &Symbol {
        self.order.symbol()
    }

    /// Topic the update is published on: `orders.updates.{SYMBOL}`.
    #[must_use]
    pub fn topic(&self) -> String {
        topic_for(self.order.symbol())
    }
}

/// Topic for updates of a given symbol.
#[must_use]
pub fn topic_for(symbol: &Symbol) -> String {
    format!("{ORDER_UPDATES_TOPIC_PREFIX}.{symbol}")
}
