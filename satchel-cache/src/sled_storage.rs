// SPDX-License-Identifier: AGPL-3.0-or-later
//! Durable cache storage on sled
//!
//! Each named cache is its own sled tree (`cache/{name}`), so deleting a
//! cache is a single tree drop and a precache batch lands atomically.

use async_trait::async_trait;
use sled::{Batch, Tree};

use crate::codec::{decode_entry, encode_entry};
use crate::entry::CachedEntry;
use crate::sled_backend::SledBackend;
use crate::storage::CacheStorage;
use crate::{CacheError, CacheResult};

const TREE_PREFIX: &str = "cache/";

/// Cache storage persisted in a sled database
#[derive(Clone)]
pub struct SledCacheStorage {
    backend: SledBackend,
}

impl SledCacheStorage {
    pub fn new(backend: SledBackend) -> Self {
        Self { backend }
    }

    fn tree_name(name: &str) -> String {
        format!("{TREE_PREFIX}{name}")
    }

    fn open_tree(&self, name: &str) -> CacheResult<Tree> {
        self.backend
            .db()
            .open_tree(Self::tree_name(name))
            .map_err(|e| CacheError::Database(e.to_string()))
    }

    /// Existing tree only; lookups must not create empty caches
    fn existing_tree(&self, name: &str) -> CacheResult<Option<Tree>> {
        let wanted = Self::tree_name(name);
        let exists = self
            .backend
            .db()
            .tree_names()
            .iter()
            .any(|t| t.as_ref() == wanted.as_bytes());
        if exists {
            self.open_tree(name).map(Some)
        } else {
            Ok(None)
        }
    }
}

#[async_trait]
impl CacheStorage for SledCacheStorage {
    async fn keys(&self) -> CacheResult<Vec<String>> {
        let mut names: Vec<String> = self
            .backend
            .db()
            .tree_names()
            .into_iter()
            .filter_map(|t| {
                String::from_utf8_lossy(&t)
                    .strip_prefix(TREE_PREFIX)
                    .map(String::from)
            })
            .collect();
        names.sort();
        Ok(names)
    }

    async fn has(&self, name: &str) -> CacheResult<bool> {
        Ok(self.existing_tree(name)?.is_some())
    }

    async fn delete(&self, name: &str) -> CacheResult<bool> {
        self.backend
            .db()
            .drop_tree(Self::tree_name(name))
            .map_err(|e| CacheError::Database(e.to_string()))
    }

    async fn get(&self, name: &str, url: &str) -> CacheResult<Option<CachedEntry>> {
        let Some(tree) = self.existing_tree(name)? else {
            return Ok(None);
        };

        let Some(data) = tree
            .get(url)
            .map_err(|e| CacheError::Database(e.to_string()))?
        else {
            return Ok(None);
        };

        let entry = match decode_entry(&data) {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!(cache = name, url, error = %e, "Discarding undecodable cached entry");
                return Ok(None);
            }
        };
        if !entry.verify() {
            tracing::warn!(cache = name, url, "Discarding cached entry with bad content hash");
            return Ok(None);
        }
        Ok(Some(entry))
    }

    async fn put(&self, name: &str, entry: CachedEntry) -> CacheResult<()> {
        let value = encode_entry(&entry)?;
        self.open_tree(name)?
            .insert(entry.url.as_bytes(), value)
            .map_err(|e| CacheError::Database(e.to_string()))?;
        Ok(())
    }

    async fn put_all(&self, name: &str, entries: Vec<CachedEntry>) -> CacheResult<()> {
        // Encode everything before touching the tree
        let mut batch = Batch::default();
        for entry in &entries {
            batch.insert(entry.url.as_bytes(), encode_entry(entry)?);
        }

        self.open_tree(name)?
            .apply_batch(batch)
            .map_err(|e| CacheError::Database(e.to_string()))
    }

    async fn remove(&self, name: &str, url: &str) -> CacheResult<bool> {
        let Some(tree) = self.existing_tree(name)? else {
            return Ok(false);
        };
        tree.remove(url)
            .map_err(|e| CacheError::Database(e.to_string()))
            .map(|old| old.is_some())
    }

    async fn urls(&self, name: &str) -> CacheResult<Vec<String>> {
        let Some(tree) = self.existing_tree(name)? else {
            return Ok(Vec::new());
        };
        tree.iter()
            .keys()
            .map(|k| {
                k.map(|k| String::from_utf8_lossy(&k).into_owned())
                    .map_err(|e| CacheError::Database(e.to_string()))
            })
            .collect()
    }
}
