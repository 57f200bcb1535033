// Allow unwrap/expect in tests - tests should panic on unexpected errors
// Allow test-specific patterns and pedantic lints in test code
#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::float_cmp,
        clippy::significant_drop_tightening,
        clippy::too_many_lines,
        clippy::match_same_arms,
        clippy::needless_pass_by_value,
        clippy::needless_collect,
        clippy::option_if_let_else,
        clippy::default_trait_access,
        clippy::items_after_statements,
        clippy::or_fun_call
    )
)]

//! Order Executor - Rust Core Library
//!
//! Order-execution core of the trading platform: validates order intents,
//! gates exchange traffic, signs and submits orders, and drives every order
//! through its lifecycle.
//!
//! # Architecture (Clean Architecture + DDD + Hexagonal)
//!
//! ## Layers (inside → outside)
//!
//! - **Domain**: Core business logic (aggregates, value objects, domain events)
//!   - `order_execution`: Order aggregate, state machine, fills, order updates
//!   - `risk_management`: Symbol rules, risk limits, fail-fast order validator
//!
//! - **Application**: Use cases and orchestration
//!   - `ports`: Interfaces for external systems (`ExchangePort`, `CacheStore`,
//!     `EventPublisherPort`)
//!   - `services`: `OrderExecutor`, two-tier `StateStore`, per-order locks
//!   - `dto`: Data transfer objects for API boundaries
//!
//! - **Infrastructure**: Adapters (implementations)
//!   - `exchange`: Binance USDⓈ-M futures REST adapter
//!   - `cache`: In-memory TTL cache
//!   - `events`: Broadcast order update bus
//!
//! - **Cross-cutting**: `resilience` (rate limiter, circuit breaker),
//!   `observability` (metrics, logging), `config`, `error`

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

// =============================================================================
// Clean Architecture Layers
// =============================================================================

/// Domain layer - Core business logic with no external dependencies.
pub mod domain;

/// Application layer - Use cases and port definitions.
pub mod application;

/// Infrastructure layer - Adapters and external integrations.
pub mod infrastructure;

// =============================================================================
// Cross-cutting Modules
// =============================================================================

/// Configuration loading and validation.
pub mod config;

/// Execution error taxonomy.
pub mod error;

/// Metrics and structured logging.
pub mod observability;

/// Rate limiting and circuit breaking.
pub mod resilience;

// =============================================================================
// Re-exports
// =============================================================================

pub use application::dto::{CreateOrderDto, OrderDto, OrderUpdateFilter};
pub use application::services::{OrderExecutor, StateStore};
pub use domain::order_execution::{
    Fill, Order, OrderSide, OrderStatus, OrderType, OrderUpdate, TimeInForce, UpdateType,
};
pub use domain::risk_management::{OrderValidator, RiskLimits, SymbolRule, SymbolRuleTable};
pub use error::ExecutionError;
