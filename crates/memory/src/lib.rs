//! Storage implementations for Nexus: the TTL cache and its backends,
//! plus in-memory history and profile stores.

pub mod cache;
pub mod history;
pub mod in_memory;
pub mod profiles;

#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use cache::{CacheInfo, CacheListing, Clock, SystemClock, TtlCache};
pub use history::InMemoryHistory;
pub use in_memory::InMemoryCacheStore;
pub use profiles::InMemoryProfiles;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteCacheStore;
