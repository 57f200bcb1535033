//! Configured risk limits.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::domain::shared::Symbol;

/// Pre-trade risk limits applied by the validator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskLimits {
    /// Maximum notional of a single order.
    pub max_order_value: Decimal,
    /// Maximum absolute position per symbol, in base-asset units.
    pub max_position_size: Decimal,
    /// Maximum orders created per UTC day.
    pub max_daily_orders: u32,
    /// Maximum simultaneously open orders.
    pub max_open_orders: u32,
    /// Symbols allowed to trade; empty allows every registered symbol.
    pub allowed_symbols: Vec<Symbol>,
    /// Accepted deviation of a limit price from the reference price (0.10 = 10%).
    pub price_band_pct: Decimal,
}

impl Default for RiskLimits {
    fn default() -> Self {
        Self {
            max_order_value: dec!(1000000),
            max_position_size: dec!(10),
            max_daily_orders: 10_000,
            max_open_orders: 500,
            allowed_symbols: Vec::new(),
            price_band_pct: dec!(0.10),
        }
    }
}

impl RiskLimits {
    /// True if `symbol` passes the allow-list.
    #[must_use]
    pub fn is_symbol_allowed(&self, symbol: &Symbol) -> bool {
        self.allowed_symbols.is_empty() || self.allowed_symbols.contains(symbol)
    }

    /// Inclusive price band around `reference`.
    #[must_use]
    pub fn price_band(&self, reference: Decimal) -> (Decimal, Decimal) {
        let delta = reference * self.price_band_pct;
        (reference - delta, reference + delta)
    }
}
