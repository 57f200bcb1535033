//! Per-symbol trading rules.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::shared::Symbol;

/// Trading constraints for one symbol, as published by the exchange.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolRule {
    /// Symbol the rule applies to.
    pub symbol: Symbol,
    /// Minimum price increment.
    pub tick_size: Decimal,
    /// Minimum quantity increment.
    pub step_size: Decimal,
    /// Minimum order quantity.
    pub min_qty: Decimal,
    /// Maximum order quantity.
    pub max_qty: Decimal,
    /// Minimum order notional (price x quantity).
    pub min_notional: Decimal,
    /// Maximum decimal places accepted for prices.
    pub price_precision: u32,
    /// Maximum decimal places accepted for quantities.
    pub quantity_precision: u32,
    /// Whether the symbol currently accepts orders.
    pub tradable: bool,
}

impl SymbolRule {
    /// True if `quantity` is an exact multiple of the step size.
    ///
    /// A zero step size means the exchange imposes no step.
    #[must_use]
    pub fn is_step_aligned(&self, quantity: Decimal) -> bool {
        is_multiple_of(quantity, self.step_size)
    }

    /// True if `price` is an exact multiple of the tick size.
    #[must_use]
    pub fn is_tick_aligned(&self, price: Decimal) -> bool {
        is_multiple_of(price, self.tick_size)
    }

    /// True if `quantity` carries no more decimals than `quantity_precision`.
    #[must_use]
    pub fn fits_quantity_precision(&self, quantity: Decimal) -> bool {
        quantity.normalize().scale() <= self.quantity_precision
    }

    /// True if `price` carries no more decimals than `price_precision`.
    #[must_use]
    pub fn fits_price_precision(&self, price: Decimal) -> bool {
        price.normalize().scale() <= self.price_precision
    }
}

fn is_multiple_of(value: Decimal, increment: Decimal) -> bool {
    if increment <= Decimal::ZERO {
        return true;
    }
    value
        .checked_rem(increment)
        .is_some_and(|remainder| remainder.is_zero())
}

/// Read-mostly table of symbol rules.
///
/// The table is only ever replaced wholesale; readers hold an `Arc` snapshot
/// that stays consistent while a refresh swaps in a new map.
#[derive(Debug, Default)]
pub struct SymbolRuleTable {
    rules: RwLock<Arc<HashMap<Symbol, SymbolRule>>>,
}

impl SymbolRuleTable {
    /// Create an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a table pre-populated with `rules`.
    #[must_use]
    pub fn with_rules(rules: impl IntoIterator<Item = SymbolRule>) -> Self {
        let table = Self::new();
        table.replace_all(rules);
        table
    }

    /// Replace every rule at once.
    pub fn replace_all(&self, rules: impl IntoIterator<Item = SymbolRule>) {
        let map: HashMap<Symbol, SymbolRule> = rules
            .into_iter()
            .map(|rule| (rule.symbol.clone(), rule))
            .collect();

        let mut guard = self
            .rules
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        *guard = Arc::new(map);
    }

    /// Look up the rule for `symbol`.
    #[must_use]
    pub fn get(&self, symbol: &Symbol) -> Option<SymbolRule> {
        self.snapshot().get(symbol).cloned()
    }

    /// Consistent view of the whole table.
    #[must_use]
    pub fn snapshot(&self) -> Arc<HashMap<Symbol, SymbolRule>> {
        Arc::clone(
            &self
                .rules
                .read()
                .unwrap_or_else(std::sync::PoisonError::into_inner),
        )
    }

    /// Number of registered symbols.
    #[must_use]
    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    /// True if no rule has been loaded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.snapshot().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn btc_rule() -> SymbolRule {
        SymbolRule {
            symbol: Symbol::new("BTCUSDT"),
            tick_size: dec!(0.01),
            step_size: dec!(0.001),
            min_qty: dec!(0.001),
            max_qty: dec!(1000),
            min_notional: dec!(10),
            price_precision: 2,
            quantity_precision: 3,
            tradable: true,
        }
    }

    #[test]
    fn step_alignment() {
        let rule = btc_rule();
        assert!(rule.is_step_aligned(dec!(0.001)));
        assert!(rule.is_step_aligned(dec!(1.250)));
        assert!(!rule.is_step_aligned(dec!(0.0015)));
    }

    #[test]
    fn tick_alignment() {
        let rule = btc_rule();
        assert!(rule.is_tick_aligned(dec!(45000)));
        assert!(rule.is_tick_aligned(dec!(45000.01)));
        assert!(!rule.is_tick_aligned(dec!(45000.005)));
    }

    #[test]
    fn zero_increment_imposes_no_constraint() {
        let mut rule = btc_rule();
        rule.step_size = Decimal::ZERO;
        assert!(rule.is_step_aligned(dec!(0.123456)));
    }

    #[test]
    fn precision_ignores_trailing_zeros() {
        let rule = btc_rule();
        assert!(rule.fits_quantity_precision(dec!(0.00100000)));
        assert!(!rule.fits_quantity_precision(dec!(0.0001)));
        assert!(rule.fits_price_precision(dec!(45000.10)));
        assert!(!rule.fits_price_precision(dec!(45000.123)));
    }

    #[test]
    fn table_replace_all_is_wholesale() {
        let table = SymbolRuleTable::with_rules([btc_rule()]);
        assert_eq!(table.len(), 1);

        let mut eth = btc_rule();
        eth.symbol = Symbol::new("ETHUSDT");
        table.replace_all([eth]);

        assert!(table.get(&Symbol::new("BTCUSDT")).is_none());
        assert!(table.get(&Symbol::new("ETHUSDT")).is_some());
    }

    #[test]
    fn snapshot_survives_refresh() {
        let table = SymbolRuleTable::with_rules([btc_rule()]);
        let before = table.snapshot();
        table.replace_all(Vec::new());

        assert_eq!(before.len(), 1);
        assert!(table.is_empty());
    }
}
