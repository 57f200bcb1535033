//! Validation failures.

use std::fmt;

use crate::domain::order_execution::value_objects::{OrderType, TimeInForce};

/// The single reason an order intent failed pre-trade validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationFailure {
    /// Symbol has no registered trading rule.
    UnknownSymbol {
        /// Offending symbol.
        symbol: String,
    },

    /// Symbol is registered but not currently trading.
    SymbolNotTradable {
        /// Offending symbol.
        symbol: String,
    },

    /// Symbol is not on the configured allow-list.
    SymbolNotAllowed {
        /// Offending symbol.
        symbol: String,
    },

    /// Quantity violates size, step or precision rules.
    Quantity {
        /// Human-readable reason.
        reason: String,
    },

    /// Price violates tick, band or precision rules.
    Price {
        /// Human-readable reason.
        reason: String,
    },

    /// Notional value is below the exchange minimum.
    Notional {
        /// Computed notional.
        notional: String,
        /// Required minimum.
        min_notional: String,
    },

    /// A risk limit would be breached.
    Risk {
        /// Limit name.
        limit: &'static str,
        /// Human-readable reason.
        reason: String,
    },

    /// Time in force incompatible with the order type.
    TimeInForce {
        /// Order type.
        order_type: OrderType,
        /// Requested time in force.
        time_in_force: Option<TimeInForce>,
    },
}

impl ValidationFailure {
    /// Failure category: `symbol`, `quantity`, `price`, `notional`, `risk` or `time_in_force`.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::UnknownSymbol { .. }
            | Self::SymbolNotTradable { .. }
            | Self::SymbolNotAllowed { .. } => "symbol",
            Self::Quantity { .. } => "quantity",
            Self::Price { .. } => "price",
            Self::Notional { .. } => "notional",
            Self::Risk { .. } => "risk",
            Self::TimeInForce { .. } => "time_in_force",
        }
    }
}

impl fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownSymbol { symbol } => write!(f, "Unknown symbol: {symbol}"),
            Self::SymbolNotTradable { symbol } => {
                write!(f, "Symbol {symbol} is not currently tradable")
            }
            Self::SymbolNotAllowed { symbol } => {
                write!(f, "Symbol {symbol} is not in the allowed list")
            }
            Self::Quantity { reason } => write!(f, "Invalid quantity: {reason}"),
            Self::Price { reason } => write!(f, "Invalid price: {reason}"),
            Self::Notional {
                notional,
                min_notional,
            } => write!(
                f,
                "Notional {notional} is below minimum notional {min_notional}"
            ),
            Self::Risk { limit, reason } => write!(f, "Risk limit [{limit}]: {reason}"),
            Self::TimeInForce {
                order_type,
                time_in_force,
            } => match time_in_force {
                Some(tif) => write!(f, "Time in force {tif} is not allowed for {order_type} orders"),
                None => write!(f, "{order_type} orders require a time in force"),
            },
        }
    }
}

impl std::error::Error for ValidationFailure {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_groups_symbol_failures() {
        let unknown = ValidationFailure::UnknownSymbol {
            symbol: "XYZUSDT".to_string(),
        };
        let halted = ValidationFailure::SymbolNotTradable {
            symbol: "XYZUSDT".to_string(),
        };
        assert_eq!(unknown.kind(), "symbol");
        assert_eq!(halted.kind(), "symbol");
    }

    #[test]
    fn notional_display() {
        let err = ValidationFailure::Notional {
            notional: "4.5".to_string(),
            min_notional: "10".to_string(),
        };
        let msg = format!("{err}");
        assert!(msg.contains("4.5"));
        assert!(msg.contains("10"));
        assert_eq!(err.kind(), "notional");
    }

    #[test]
    fn time_in_force_display() {
        let err = ValidationFailure::TimeInForce {
            order_type: OrderType::PostOnly,
            time_in_force: Some(TimeInForce::Gtc),
        };
        assert_eq!(
            format!("{err}"),
            "Time in force GTC is not allowed for POST_ONLY orders"
        );
        assert_eq!(err.kind(), "time_in_force");
    }

    #[test]
    fn risk_display_names_limit() {
        let err = ValidationFailure::Risk {
            limit: "max_open_orders",
            reason: "500 open orders".to_string(),
        };
        assert!(format!("{err}").contains("max_open_orders"));
    }

    #[test]
    fn is_std_error() {
        let err: Box<dyn std::error::Error> = Box::new(ValidationFailure::Quantity {
            reason: "zero".to_string(),
        });
        assert!(!err.to_string().is_empty());
    }
}
