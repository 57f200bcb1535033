//! Order Validator
//!
//! Fail-fast pre-trade checks. Rules are evaluated in a fixed order and the
//! first failure is the only one reported:
//!
//! 1. Symbol registered, tradable and allowed
//! 2. Quantity positive, within `[min_qty, max_qty]`, step aligned, within precision
//! 3. Price (non-market) positive, tick aligned, within precision and the reference band
//! 4. Notional at or above `min_notional`
//! 5. Risk: order value, resulting position, daily and open order counts
//! 6. Time in force compatible with the order type

use std::sync::Arc;

use rust_decimal::Decimal;

use crate::domain::order_execution::aggregate::Order;
use crate::domain::order_execution::value_objects::{OrderType, TimeInForce};
use crate::domain::risk_management::errors::ValidationFailure;
use crate::domain::risk_management::value_objects::{
    RiskLimits, RiskSnapshot, SymbolRule, SymbolRuleTable,
};

/// Validates orders against symbol rules and risk limits.
///
/// Validation never mutates shared state.
#[derive(Debug, Clone)]
pub struct OrderValidator {
    rules: Arc<SymbolRuleTable>,
    limits: RiskLimits,
}

impl OrderValidator {
    /// Create a validator over a shared rule table.
    #[must_use]
    pub const fn new(rules: Arc<SymbolRuleTable>, limits: RiskLimits) -> Self {
        Self { rules, limits }
    }

    /// Get the configured risk limits.
    #[must_use]
    pub const fn limits(&self) -> &RiskLimits {
        &self.limits
    }

    /// Get the shared rule table.
    #[must_use]
    pub const fn rules(&self) -> &Arc<SymbolRuleTable> {
        &self.rules
    }

    /// Validate an order.
    ///
    /// # Errors
    ///
    /// Returns the first rule the order violates.
    pub fn validate(&self, order: &Order, snapshot: &RiskSnapshot) -> Result<(), ValidationFailure> {
        let rule = self.validate_symbol(order)?;
        Self::validate_quantity(order, &rule)?;
        self.validate_price(order, &rule, snapshot)?;
        let notional = Self::notional(order, snapshot);
        Self::validate_notional(notional, &rule)?;
        self.validate_risk(order, notional, snapshot)?;
        Self::validate_time_in_force(order)
    }

    fn validate_symbol(&self, order: &Order) -> Result<SymbolRule, ValidationFailure> {
        let symbol = order.symbol();
        let rule = self
            .rules
            .get(symbol)
            .ok_or_else(|| ValidationFailure::UnknownSymbol {
                symbol: symbol.to_string(),
            })?;

        if !rule.tradable {
            return Err(ValidationFailure::SymbolNotTradable {
                symbol: symbol.to_string(),
            });
        }

        if !self.limits.is_symbol_allowed(symbol) {
            return Err(ValidationFailure::SymbolNotAllowed {
                symbol: symbol.to_string(),
            });
        }

        Ok(rule)
    }

    fn validate_quantity(order: &Order, rule: &SymbolRule) -> Result<(), ValidationFailure> {
        let quantity = order.quantity();

        if quantity <= Decimal::ZERO {
            return Err(ValidationFailure::Quantity {
                reason: format!("quantity {quantity} must be positive"),
            });
        }

        if quantity < rule.min_qty {
            return Err(ValidationFailure::Quantity {
                reason: format!("quantity {quantity} is below minimum {}", rule.min_qty),
            });
        }

        if quantity > rule.max_qty {
            return Err(ValidationFailure::Quantity {
                reason: format!("quantity {quantity} exceeds maximum {}", rule.max_qty),
            });
        }

        if !rule.is_step_aligned(quantity) {
            return Err(ValidationFailure::Quantity {
                reason: format!(
                    "quantity {quantity} is not a multiple of step size {}",
                    rule.step_size
                ),
            });
        }

        if !rule.fits_quantity_precision(quantity) {
            return Err(ValidationFailure::Quantity {
                reason: format!(
                    "quantity {quantity} exceeds {} decimal places",
                    rule.quantity_precision
                ),
            });
        }

        Ok(())
    }

    fn validate_price(
        &self,
        order: &Order,
        rule: &SymbolRule,
        snapshot: &RiskSnapshot,
    ) -> Result<(), ValidationFailure> {
        if order.order_type().is_market() {
            return Ok(());
        }

        let price = match order.price() {
            Some(price) if price > Decimal::ZERO => price,
            Some(price) => {
                return Err(ValidationFailure::Price {
                    reason: format!("price {price} must be positive"),
                });
            }
            None => {
                return Err(ValidationFailure::Price {
                    reason: format!("{} orders require a price", order.order_type()),
                });
            }
        };

        if !rule.is_tick_aligned(price) {
            return Err(ValidationFailure::Price {
                reason: format!(
                    "price {price} is not a multiple of tick size {}",
                    rule.tick_size
                ),
            });
        }

        if !rule.fits_price_precision(price) {
            return Err(ValidationFailure::Price {
                reason: format!(
                    "price {price} exceeds {} decimal places",
                    rule.price_precision
                ),
            });
        }

        if let Some(reference) = snapshot.reference_price {
            let (low, high) = self.limits.price_band(reference);
            if price < low || price > high {
                return Err(ValidationFailure::Price {
                    reason: format!(
                        "price {price} is outside the band [{low}, {high}] around reference {reference}"
                    ),
                });
            }
        }

        Ok(())
    }

    /// Order notional: limit price, or the reference price for market orders.
    fn notional(order: &Order, snapshot: &RiskSnapshot) -> Option<Decimal> {
        let price = if order.order_type().is_market() {
            snapshot.reference_price
        } else {
            order.price()
        }?;
        price.checked_mul(order.quantity())
    }

    fn validate_notional(
        notional: Option<Decimal>,
        rule: &SymbolRule,
    ) -> Result<(), ValidationFailure> {
        match notional {
            Some(notional) if notional < rule.min_notional => Err(ValidationFailure::Notional {
                notional: notional.normalize().to_string(),
                min_notional: rule.min_notional.normalize().to_string(),
            }),
            _ => Ok(()),
        }
    }

    fn validate_risk(
        &self,
        order: &Order,
        notional: Option<Decimal>,
        snapshot: &RiskSnapshot,
    ) -> Result<(), ValidationFailure> {
        let limits = &self.limits;

        if let Some(value) = notional
            && value > limits.max_order_value
        {
            return Err(ValidationFailure::Risk {
                limit: "max_order_value",
                reason: format!(
                    "order value {} exceeds {}",
                    value.normalize(),
                    limits.max_order_value
                ),
            });
        }

        let resulting = snapshot.position + order.side().signed(order.quantity());
        if resulting.abs() > limits.max_position_size {
            return Err(ValidationFailure::Risk {
                limit: "max_position_size",
                reason: format!(
                    "resulting position {} exceeds {}",
                    resulting.normalize(),
                    limits.max_position_size
                ),
            });
        }

        if snapshot.daily_orders >= limits.max_daily_orders {
            return Err(ValidationFailure::Risk {
                limit: "max_daily_orders",
                reason: format!(
                    "{} orders created today, limit {}",
                    snapshot.daily_orders, limits.max_daily_orders
                ),
            });
        }

        if snapshot.open_orders >= limits.max_open_orders {
            return Err(ValidationFailure::Risk {
                limit: "max_open_orders",
                reason: format!(
                    "{} orders open, limit {}",
                    snapshot.open_orders, limits.max_open_orders
                ),
            });
        }

        Ok(())
    }

    fn validate_time_in_force(order: &Order) -> Result<(), ValidationFailure> {
        let tif = order.time_in_force();
        let allowed = if order.is_post_only() {
            tif == Some(TimeInForce::Gtx)
        } else {
            match order.order_type() {
                OrderType::Market => matches!(tif, None | Some(TimeInForce::Ioc)),
                OrderType::Limit | OrderType::PostOnly => tif.is_some(),
            }
        };

        if allowed {
            Ok(())
        } else {
            Err(ValidationFailure::TimeInForce {
                order_type: order.order_type(),
                time_in_force: tif,
            })
        }
    }
}
