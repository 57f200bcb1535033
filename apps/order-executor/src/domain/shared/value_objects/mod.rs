//! Shared value objects used across bounded contexts.

mod identifiers;
mod symbol;
mod timestamp;

pub use identifiers::{ClientOrderId, ExchangeOrderId, FillId, OrderId};
pub use symbol::Symbol;
pub use timestamp::Timestamp;
