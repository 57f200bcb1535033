//! Order Aggregate Root
//!
//! The Order aggregate owns the lifecycle of one order. Every mutation goes
//! through a transition method that consults `OrderStateMachine` and records
//! an update for publication.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::order_execution::errors::OrderError;
use crate::domain::order_execution::events::{OrderUpdate, UpdateType};
use crate::domain::order_execution::services::OrderStateMachine;
use crate::domain::order_execution::value_objects::{
    Fill, OrderSide, OrderStatus, OrderType, TimeInForce,
};
use crate::domain::shared::{ClientOrderId, ExchangeOrderId, OrderId, Symbol, Timestamp};

/// Command to create a new order.
#[derive(Debug, Clone)]
pub struct CreateOrderCommand {
    /// Caller reference; defaults to the generated order id.
    pub client_order_id: Option<ClientOrderId>,
    /// Symbol to trade.
    pub symbol: Symbol,
    /// Order side.
    pub side: OrderSide,
    /// Order type.
    pub order_type: OrderType,
    /// Quantity to trade.
    pub quantity: Decimal,
    /// Limit price (required for Limit/PostOnly).
    pub price: Option<Decimal>,
    /// Time in force; `None` is only meaningful for market orders.
    pub time_in_force: Option<TimeInForce>,
    /// Post-only flag (equivalent to `OrderType::PostOnly`).
    pub post_only: bool,
    /// Reduce-only flag forwarded to the exchange.
    pub reduce_only: bool,
}

/// Order Aggregate Root.
#[allow(clippy::struct_field_names)]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    id: OrderId,
    client_order_id: ClientOrderId,
    exchange_order_id: Option<ExchangeOrderId>,
    symbol: Symbol,
    side: OrderSide,
    order_type: OrderType,
    quantity: Decimal,
    price: Option<Decimal>,
    time_in_force: Option<TimeInForce>,
    post_only: bool,
    reduce_only: bool,
    status: OrderStatus,
    filled_quantity: Decimal,
    avg_fill_price: Decimal,
    fee: Decimal,
    fee_asset: Option<String>,
    reject_reason: Option<String>,
    created_at: Timestamp,
    updated_at: Timestamp,
    #[serde(skip)]
    updates: Vec<UpdateType>,
}

impl Order {
    /// Create a new order in `New` status.
    ///
    /// No update is recorded: `New` is transient and never published.
    #[must_use]
    pub fn new(cmd: CreateOrderCommand) -> Self {
        let id = OrderId::generate();
        let now = Timestamp::now();
        let client_order_id = cmd
            .client_order_id
            .unwrap_or_else(|| ClientOrderId::from_order_id(&id));

        Self {
            id,
            client_order_id,
            exchange_order_id: None,
            symbol: cmd.symbol,
            side: cmd.side,
            order_type: cmd.order_type,
            quantity: cmd.quantity,
            price: cmd.price,
            time_in_force: cmd.time_in_force,
            post_only: cmd.post_only,
            reduce_only: cmd.reduce_only,
            status: OrderStatus::New,
            filled_quantity: Decimal::ZERO,
            avg_fill_price: Decimal::ZERO,
            fee: Decimal::ZERO,
            fee_asset: None,
            reject_reason: None,
            created_at: now,
            updated_at: now,
            updates: Vec::new(),
        }
    }

    // ========================================================================
    // Getters
    // ========================================================================

    /// Get the order ID.
    #[must_use]
    pub const fn id(&self) -> &OrderId {
        &self.id
    }

    /// Get the client order ID.
    #[must_use]
    pub const fn client_order_id(&self) -> &ClientOrderId {
        &self.client_order_id
    }

    /// Get the exchange order ID (set once submitted).
    #[must_use]
    pub const fn exchange_order_id(&self) -> Option<&ExchangeOrderId> {
        self.exchange_order_id.as_ref()
    }

    /// Get the symbol.
    #[must_use]
    pub const fn symbol(&self) -> &Symbol {
        &self.symbol
    }

    /// Get the order side.
    #[must_use]
    pub const fn side(&self) -> OrderSide {
        self.side
    }

    /// Get the order type.
    #[must_use]
    pub const fn order_type(&self) -> OrderType {
        self.order_type
    }

    /// Get the quantity.
    #[must_use]
    pub const fn quantity(&self) -> Decimal {
        self.quantity
    }

    /// Get the limit price.
    #[must_use]
    pub const fn price(&self) -> Option<Decimal> {
        self.price
    }

    /// Get the time in force.
    #[must_use]
    pub const fn time_in_force(&self) -> Option<TimeInForce> {
        self.time_in_force
    }

    /// True for `POST_ONLY` orders or limit orders flagged post-only.
    #[must_use]
    pub const fn is_post_only(&self) -> bool {
        self.post_only || matches!(self.order_type, OrderType::PostOnly)
    }

    /// Get the reduce-only flag.
    #[must_use]
    pub const fn reduce_only(&self) -> bool {
        self.reduce_only
    }

    /// Get the current status.
    #[must_use]
    pub const fn status(&self) -> OrderStatus {
        self.status
    }

    /// Get the cumulative filled quantity.
    #[must_use]
    pub const fn filled_quantity(&self) -> Decimal {
        self.filled_quantity
    }

    /// Quantity still open at the exchange.
    #[must_use]
    pub fn remaining_quantity(&self) -> Decimal {
        self.quantity - self.filled_quantity
    }

    /// Get the volume-weighted average fill price (zero until first fill).
    #[must_use]
    pub const fn avg_fill_price(&self) -> Decimal {
        self.avg_fill_price
    }

    /// Get the accumulated commission.
    #[must_use]
    pub const fn fee(&self) -> Decimal {
        self.fee
    }

    /// Get the commission asset.
    #[must_use]
    pub fn fee_asset(&self) -> Option<&str> {
        self.fee_asset.as_deref()
    }

    /// Get the reject reason.
    #[must_use]
    pub fn reject_reason(&self) -> Option<&str> {
        self.reject_reason.as_deref()
    }

    /// Get the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> Timestamp {
        self.created_at
    }

    /// Get the last update timestamp.
    #[must_use]
    pub const fn updated_at(&self) -> Timestamp {
        self.updated_at
    }

    // ========================================================================
    // State Transitions
    // ========================================================================

    /// Mark the order as accepted by the exchange.
    ///
    /// # Errors
    ///
    /// Returns error if the order is not `New`.
    pub fn submit(&mut self, exchange_order_id: ExchangeOrderId) -> Result<(), OrderError> {
        OrderStateMachine::validate_transition(self.status, OrderStatus::Submitted)?;

        self.exchange_order_id = Some(exchange_order_id);
        self.transition(OrderStatus::Submitted, UpdateType::Created);
        Ok(())
    }

    /// Reject the order.
    ///
    /// # Errors
    ///
    /// Returns error if the order is not `New`.
    pub fn reject(&mut self, reason: impl Into<String>) -> Result<(), OrderError> {
        OrderStateMachine::validate_transition(self.status, OrderStatus::Rejected)?;

        self.reject_reason = Some(reason.into());
        self.transition(OrderStatus::Rejected, UpdateType::Rejected);
        Ok(())
    }

    /// Cancel the order.
    ///
    /// # Errors
    ///
    /// Returns error if the order is not `Submitted` or `PartiallyFilled`.
    pub fn cancel(&mut self) -> Result<(), OrderError> {
        if !self.status.is_cancelable() {
            return Err(OrderError::CannotCancel {
                status: self.status,
            });
        }
        OrderStateMachine::validate_transition(self.status, OrderStatus::Canceled)?;

        self.transition(OrderStatus::Canceled, UpdateType::Canceled);
        Ok(())
    }

    /// Apply a fill to the order.
    ///
    /// Recomputes the running weighted-average price and moves to
    /// `PartiallyFilled` or `Filled`. On error the order is unchanged.
    ///
    /// # Errors
    ///
    /// Returns error if the order cannot receive fills or the fill is invalid.
    pub fn apply_fill(&mut self, fill: &Fill) -> Result<(), OrderError> {
        if !self.status.can_fill() {
            return Err(OrderError::CannotFill {
                status: self.status,
            });
        }

        if fill.order_id != self.id {
            return Err(OrderError::InvalidFill {
                reason: format!("fill targets order {}, not {}", fill.order_id, self.id),
            });
        }

        if fill.symbol != self.symbol {
            return Err(OrderError::InvalidFill {
                reason: format!("fill is for {}, order trades {}", fill.symbol, self.symbol),
            });
        }

        if fill.side != self.side {
            return Err(OrderError::InvalidFill {
                reason: format!("fill side {} does not match order side {}", fill.side, self.side),
            });
        }

        if fill.quantity <= Decimal::ZERO || fill.price <= Decimal::ZERO {
            return Err(OrderError::InvalidFill {
                reason: format!(
                    "price and quantity must be positive (price={}, quantity={})",
                    fill.price, fill.quantity
                ),
            });
        }

        let remaining = self.remaining_quantity();
        if fill.quantity > remaining {
            return Err(OrderError::FillExceedsRemaining {
                fill_qty: fill.quantity.to_string(),
                remaining_qty: remaining.to_string(),
            });
        }

        let new_filled = self.filled_quantity + fill.quantity;
        let avg_fill_price = self
            .avg_fill_price
            .checked_mul(self.filled_quantity)
            .and_then(|prior| prior.checked_add(fill.price.checked_mul(fill.quantity)?))
            .and_then(|total| total.checked_div(new_filled))
            .ok_or_else(|| OrderError::InvalidFill {
                reason: "average price overflow".to_string(),
            })?;

        let (target, update) = if new_filled == self.quantity {
            (OrderStatus::Filled, UpdateType::Filled)
        } else {
            (OrderStatus::PartiallyFilled, UpdateType::Updated)
        };
        OrderStateMachine::validate_transition(self.status, target)?;

        self.filled_quantity = new_filled;
        self.avg_fill_price = avg_fill_price;
        self.fee += fill.fee;
        if fill.fee_asset.is_some() {
            self.fee_asset.clone_from(&fill.fee_asset);
        }
        self.transition(target, update);
        Ok(())
    }

    // ========================================================================
    // Updates
    // ========================================================================

    /// Drain accumulated updates as snapshots of the current state.
    pub fn drain_updates(&mut self) -> Vec<OrderUpdate> {
        let kinds = std::mem::take(&mut self.updates);
        kinds
            .into_iter()
            .map(|update_type| OrderUpdate {
                order: self.clone(),
                update_type,
                timestamp: self.updated_at,
            })
            .collect()
    }

    /// Get pending updates without draining.
    #[must_use]
    pub fn pending_updates(&self) -> &[UpdateType] {
        &self.updates
    }

    fn transition(&mut self, to: OrderStatus, update: UpdateType) {
        self.status = to;
        self.updated_at = Timestamp::now();
        self.updates.push(update);
    }
}
