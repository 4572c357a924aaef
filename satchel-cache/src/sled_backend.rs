// SPDX-License-Identifier: AGPL-3.0-or-later
//! Sled database backend for durable storage

use sled::Db;
use std::path::{Path, PathBuf};

use crate::kv::KeyValueStore;
use crate::{CacheError, CacheResult};

/// Sled-based storage backend
#[derive(Clone)]
pub struct SledBackend {
    db: Db,
}

impl SledBackend {
    /// Open or create a sled database at the given path
    pub fn open(path: impl AsRef<Path>) -> CacheResult<Self> {
        let db = sled::open(path).map_err(|e| CacheError::Database(e.to_string()))?;
        Ok(Self { db })
    }

    /// Throwaway database removed when dropped
    pub fn temporary() -> CacheResult<Self> {
        let db = sled::Config::new()
            .temporary(true)
            .open()
            .map_err(|e| CacheError::Database(e.to_string()))?;
        Ok(Self { db })
    }

    /// Default on-disk location for this user
    pub fn default_path() -> PathBuf {
        directories::ProjectDirs::from("dev", "hyperpolymath", "satchel")
            .map(|d| d.data_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from("/tmp/satchel"))
            .join("store.db")
    }

    pub(crate) fn db(&self) -> &Db {
        &self.db
    }

    /// Flush to disk
    pub fn flush(&self) -> CacheResult<()> {
        self.db
            .flush()
            .map_err(|e| CacheError::Database(e.to_string()))?;
        Ok(())
    }

    /// Get database size on disk
    pub fn size_on_disk(&self) -> CacheResult<u64> {
        self.db
            .size_on_disk()
            .map_err(|e| CacheError::Database(e.to_string()))
    }
}

impl KeyValueStore for SledBackend {
    fn get(&self, key: &str) -> CacheResult<Option<Vec<u8>>> {
        self.db
            .get(key)
            .map_err(|e| CacheError::Database(e.to_string()))
            .map(|opt| opt.map(|v| v.to_vec()))
    }

    fn insert(&self, key: &str, value: &[u8]) -> CacheResult<()> {
        self.db
            .insert(key, value)
            .map_err(|e| CacheError::Database(e.to_string()))?;
        Ok(())
    }

    fn remove(&self, key: &str) -> CacheResult<bool> {
        self.db
            .remove(key)
            .map_err(|e| CacheError::Database(e.to_string()))
            .map(|opt| opt.is_some())
    }

    fn scan_prefix(&self, prefix: &str) -> CacheResult<Vec<(String, Vec<u8>)>> {
        self.db
            .scan_prefix(prefix)
            .map(|result| {
                result
                    .map(|(k, v)| (String::from_utf8_lossy(&k).into_owned(), v.to_vec()))
                    .map_err(|e| CacheError::Database(e.to_string()))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_values_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.db");

        {
            let backend = SledBackend::open(&path).unwrap();
            backend.insert_string("pwa/visit-count", "4").unwrap();
            backend.flush().unwrap();
        }

        let backend = SledBackend::open(&path).unwrap();
        assert_eq!(backend.get_string("pwa/visit-count").unwrap().as_deref(), Some("4"));
    }

    #[test]
    fn test_scan_prefix() {
        let backend = SledBackend::temporary().unwrap();
        backend.insert_string("sync/contact/1", "a").unwrap();
        backend.insert_string("sync/contact/2", "b").unwrap();
        backend.insert_string("sync/registration/1", "c").unwrap();

        let found = backend.scan_prefix("sync/contact/").unwrap();
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].0, "sync/contact/1");
    }
}
