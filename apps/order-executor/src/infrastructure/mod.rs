//! Infrastructure Layer
//!
//! Adapters implementing the ports defined in the application layer:
//!
//! - `exchange/`: Signed REST exchange adapters (Binance USDⓈ-M futures)
//! - `cache/`: Distributed cache tier of the state store
//! - `events/`: Order update bus (publish and subscribe)

pub mod cache;
pub mod events;
pub mod exchange;

pub use cache::InMemoryCacheStore;
pub use events::BroadcastEventBus;
pub use exchange::{BinanceConfig, BinanceEnvironment, BinanceError, BinanceExchangeAdapter};
