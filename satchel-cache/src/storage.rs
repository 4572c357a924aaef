// SPDX-License-Identifier: AGPL-3.0-or-later
//! Cache storage trait
//!
//! Mirrors the browser's `CacheStorage`: a set of named caches, each mapping
//! request keys to response snapshots.

use async_trait::async_trait;

use crate::entry::CachedEntry;
use crate::CacheResult;

/// Cache storage for different backends
#[async_trait]
pub trait CacheStorage: Send + Sync {
    /// Names of every existing cache, sorted
    async fn keys(&self) -> CacheResult<Vec<String>>;

    /// Whether a cache with this name exists
    async fn has(&self, name: &str) -> CacheResult<bool>;

    /// Delete a whole cache; returns whether it existed
    async fn delete(&self, name: &str) -> CacheResult<bool>;

    /// Look up an entry in one cache
    async fn get(&self, name: &str, url: &str) -> CacheResult<Option<CachedEntry>>;

    /// Store an entry, creating the cache on first write
    async fn put(&self, name: &str, entry: CachedEntry) -> CacheResult<()>;

    /// Store several entries; either all become visible or none do
    async fn put_all(&self, name: &str, entries: Vec<CachedEntry>) -> CacheResult<()>;

    /// Remove one entry; returns whether it existed
    async fn remove(&self, name: &str, url: &str) -> CacheResult<bool>;

    /// Request keys stored in one cache, sorted
    async fn urls(&self, name: &str) -> CacheResult<Vec<String>>;

    /// Look up an entry in any cache, in name order
    async fn match_any(&self, url: &str) -> CacheResult<Option<CachedEntry>> {
        for name in self.keys().await? {
            if let Some(entry) = self.get(&name, url).await? {
                return Ok(Some(entry));
            }
        }
        Ok(None)
    }

    /// Per-cache entry counts and sizes
    async fn stats(&self) -> CacheResult<CacheStats> {
        let mut stats = CacheStats::default();
        for name in self.keys().await? {
            let mut ns = NamespaceStats {
                name: name.clone(),
                ..Default::default()
            };
            for url in self.urls(&name).await? {
                if let Some(entry) = self.get(&name, &url).await? {
                    ns.entries += 1;
                    ns.total_size += entry.size();
                }
            }
            stats.namespaces.push(ns);
        }
        Ok(stats)
    }
}

/// Statistics for one named cache
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NamespaceStats {
    pub name: String,
    pub entries: u64,
    pub total_size: u64,
}

/// Cache storage statistics
#[derive(Debug, Clone, Default)]
pub struct CacheStats {
    pub namespaces: Vec<NamespaceStats>,
}

impl CacheStats {
    pub fn entries(&self) -> u64 {
        self.namespaces.iter().map(|n| n.entries).sum()
    }

    pub fn total_size(&self) -> u64 {
        self.namespaces.iter().map(|n| n.total_size).sum()
    }
}
