//! Order Execution Bounded Context
//!
//! Manages the order lifecycle from validation to completion.
//!
//! # Key Concepts
//!
//! - **Order Aggregate**: The root entity managing order state transitions
//! - **Fills**: Running weighted-average fill price, `filled_quantity <= quantity`
//! - **Order Updates**: Snapshots emitted on every transition

pub mod aggregate;
pub mod errors;
pub mod events;
pub mod services;
pub mod value_objects;

pub use aggregate::{CreateOrderCommand, Order};
pub use errors::OrderError;
pub use events::{OrderUpdate, UpdateType};
pub use services::OrderStateMachine;
pub use value_objects::{Fill, OrderSide, OrderStatus, OrderType, TimeInForce};
