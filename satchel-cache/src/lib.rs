//! Response caches for Satchel
//!
//! Storage backends:
//! - memory: per-process maps, for tests and ephemeral workers
//! - sled: pure Rust embedded KV (default), survives worker restarts
//!
//! The same sled database also backs the durable key-value store used by
//! the background-sync queue and the page-side prompt flags.

pub mod codec;
pub mod entry;
pub mod error;
pub mod kv;
pub mod memory;
pub mod namespace;
pub mod storage;

#[cfg(feature = "sled")]
pub mod sled_backend;

#[cfg(feature = "sled")]
pub mod sled_storage;

pub use entry::CachedEntry;
pub use error::{CacheError, CacheResult};
pub use kv::{KeyValueStore, MemoryKv};
pub use memory::MemoryCacheStorage;
pub use namespace::{CacheNamespace, NamespaceSet};
pub use storage::{CacheStats, CacheStorage, NamespaceStats};

#[cfg(feature = "sled")]
pub use sled_backend::SledBackend;

#[cfg(feature = "sled")]
pub use sled_storage::SledCacheStorage;
