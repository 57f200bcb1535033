//! Event bus adapters implementing `EventPublisherPort`.

mod broadcast;

pub use broadcast::{BroadcastEventBus, DEFAULT_EVENT_BUS_CAPACITY};
