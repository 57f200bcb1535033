//! Cache store adapters implementing `CacheStore`.

mod in_memory;

pub use in_memory::InMemoryCacheStore;
