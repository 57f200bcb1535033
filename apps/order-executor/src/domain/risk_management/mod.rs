//! Risk Management Bounded Context
//!
//! Pre-trade validation of order intents against exchange trading rules and
//! configured risk limits.
//!
//! # Key Concepts
//!
//! - **Symbol Rule**: Per-symbol tick/step/size/notional constraints loaded from the exchange
//! - **Risk Limits**: Per-order value, per-symbol position and order count limits
//! - **Risk Snapshot**: Read-only view of current exposure handed to the validator

pub mod errors;
pub mod services;
pub mod value_objects;

pub use errors::ValidationFailure;
pub use services::OrderValidator;
pub use value_objects::{RiskLimits, RiskSnapshot, SymbolRule, SymbolRuleTable};
