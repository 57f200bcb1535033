//! Point-in-time exposure view.

use rust_decimal::Decimal;

/// Exposure state the validator checks an order against.
///
/// Built by the executor immediately before validation; the validator never
/// reads or mutates live counters itself.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RiskSnapshot {
    /// Current signed position in the order's symbol (long positive).
    pub position: Decimal,
    /// Orders created so far in the current UTC day.
    pub daily_orders: u32,
    /// Orders currently open at the exchange.
    pub open_orders: u32,
    /// Last known reference price for the symbol.
    pub reference_price: Option<Decimal>,
}

impl RiskSnapshot {
    /// Snapshot with a reference price and no exposure.
    #[must_use]
    pub fn with_reference_price(price: Decimal) -> Self {
        Self {
            reference_price: Some(price),
            ..Self::default()
        }
    }
}
