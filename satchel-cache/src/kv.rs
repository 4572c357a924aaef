//! Durable key-value storage
//!
//! Small records that must survive a worker or page restart: the pending
//! background-sync queue and the install-prompt flags.

use parking_lot::Mutex;
use std::collections::BTreeMap;

use crate::CacheResult;

/// Ordered byte-valued key-value store
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> CacheResult<Option<Vec<u8>>>;

    fn insert(&self, key: &str, value: &[u8]) -> CacheResult<()>;

    /// Remove a key; returns whether it existed
    fn remove(&self, key: &str) -> CacheResult<bool>;

    /// All pairs whose key starts with `prefix`, in key order
    fn scan_prefix(&self, prefix: &str) -> CacheResult<Vec<(String, Vec<u8>)>>;

    fn get_string(&self, key: &str) -> CacheResult<Option<String>> {
        Ok(self
            .get(key)?
            .map(|v| String::from_utf8_lossy(&v).into_owned()))
    }

    fn insert_string(&self, key: &str, value: &str) -> CacheResult<()> {
        self.insert(key, value.as_bytes())
    }
}

/// In-memory store for tests and ephemeral clients
#[derive(Debug, Default)]
pub struct MemoryKv {
    map: Mutex<BTreeMap<String, Vec<u8>>>,
}

impl MemoryKv {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryKv {
    fn get(&self, key: &str) -> CacheResult<Option<Vec<u8>>> {
        Ok(self.map.lock().get(key).cloned())
    }

    fn insert(&self, key: &str, value: &[u8]) -> CacheResult<()> {
        self.map.lock().insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn remove(&self, key: &str) -> CacheResult<bool> {
        Ok(self.map.lock().remove(key).is_some())
    }

    fn scan_prefix(&self, prefix: &str) -> CacheResult<Vec<(String, Vec<u8>)>> {
        Ok(self
            .map
            .lock()
            .range(prefix.to_string()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }
}
