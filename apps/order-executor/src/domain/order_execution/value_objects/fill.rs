//! Execution report for a single trade against an order.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::OrderSide;
use crate::domain::shared::{FillId, OrderId, Symbol, Timestamp};

/// A fill reported by the exchange fill stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fill {
    /// Trade identifier.
    pub fill_id: FillId,
    /// Order the fill belongs to.
    pub order_id: OrderId,
    /// Symbol traded.
    pub symbol: Symbol,
    /// Side of the order.
    pub side: OrderSide,
    /// Execution price.
    pub price: Decimal,
    /// Executed quantity.
    pub quantity: Decimal,
    /// Commission charged for this fill.
    #[serde(default)]
    pub fee: Decimal,
    /// Asset the commission is charged in.
    #[serde(default)]
    pub fee_asset: Option<String>,
    /// Execution time.
    pub timestamp: Timestamp,
    /// True if the order provided liquidity.
    #[serde(default)]
    pub is_maker: bool,
}

impl Fill {
    /// Create a fill with no commission.
    #[must_use]
    pub fn new(
        order_id: OrderId,
        symbol: Symbol,
        side: OrderSide,
        price: Decimal,
        quantity: Decimal,
    ) -> Self {
        Self {
            fill_id: FillId::generate(),
            order_id,
            symbol,
            side,
            price,
            quantity,
            fee: Decimal::ZERO,
            fee_asset: None,
            timestamp: Timestamp::now(),
            is_maker: false,
        }
    }

    /// Attach commission details.
    #[must_use]
    pub fn with_fee(mut self, fee: Decimal, asset: impl Into<String>) -> Self {
        self.fee = fee;
        self.fee_asset = Some(asset.into());
        self
    }

    /// Mark the fill as maker.
    #[must_use]
    pub const fn as_maker(mut self) -> Self {
        self.is_maker = true;
        self
    }

    /// Notional value of this fill.
    #[must_use]
    pub fn notional(&self) -> Decimal {
        self.price * self.quantity
    }
}
