//! Risk management value objects.

mod risk_limits;
mod risk_snapshot;
mod symbol_rule;

pub use risk_limits::RiskLimits;
pub use risk_snapshot::RiskSnapshot;
pub use symbol_rule::{SymbolRule, SymbolRuleTable};
