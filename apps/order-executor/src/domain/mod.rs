//! Domain Layer
//!
//! The innermost layer containing business logic with zero infrastructure dependencies.
//! This layer defines:
//!
//! - **Aggregates**: Consistency boundaries with invariants
//! - **Value Objects**: Immutable domain types with equality by value
//! - **Domain Events**: Order updates recorded on every transition
//! - **Domain Services**: Stateless business logic (state machine, validation)
//!
//! # Bounded Contexts
//!
//! - [`order_execution`]: Order lifecycle and state machine
//! - [`risk_management`]: Pre-trade validation against symbol rules and risk limits

pub mod order_execution;
pub mod risk_management;
pub mod shared;
