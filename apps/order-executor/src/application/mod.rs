//! Application Layer
//!
//! The application layer orchestrates domain logic for the order executor.
//! It defines:
//!
//! - **Ports**: Interfaces for the exchange, distributed cache and event bus
//! - **Services**: The order executor and the state it coordinates
//! - **DTOs**: Data transfer objects for API boundaries

pub mod dto;
pub mod ports;
pub mod services;

pub use dto::*;
pub use ports::*;
pub use services::*;
