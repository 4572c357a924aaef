//! In-process cache storage
//!
//! Lives as long as the value does. Used by tests and by workers that do
//! not need their caches to outlive the process.

use async_trait::async_trait;
use std::collections::BTreeMap;
use tokio::sync::RwLock;

use crate::entry::CachedEntry;
use crate::storage::CacheStorage;
use crate::{CacheError, CacheResult};

type Namespaces = BTreeMap<String, BTreeMap<String, CachedEntry>>;

/// Map-backed cache storage with an optional byte quota
#[derive(Debug, Default)]
pub struct MemoryCacheStorage {
    caches: RwLock<Namespaces>,
    quota: Option<u64>,
}

impl MemoryCacheStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject writes once stored bodies would exceed `bytes`
    pub fn with_quota(bytes: u64) -> Self {
        Self {
            caches: RwLock::new(BTreeMap::new()),
            quota: Some(bytes),
        }
    }

    fn used(caches: &Namespaces) -> u64 {
        caches
            .values()
            .flat_map(|c| c.values())
            .map(|e| e.size())
            .sum()
    }

    fn check_quota(&self, caches: &Namespaces, name: &str, incoming: &[CachedEntry]) -> CacheResult<()> {
        let Some(quota) = self.quota else {
            return Ok(());
        };

        let replaced: u64 = caches
            .get(name)
            .map(|c| {
                incoming
                    .iter()
                    .filter_map(|e| c.get(&e.url))
                    .map(|e| e.size())
                    .sum()
            })
            .unwrap_or(0);
        let added: u64 = incoming.iter().map(|e| e.size()).sum();
        let projected = Self::used(caches).saturating_sub(replaced) + added;

        if projected > quota {
            return Err(CacheError::QuotaExceeded(format!(
                "{projected} bytes exceeds quota of {quota}"
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl CacheStorage for MemoryCacheStorage {
    async fn keys(&self) -> CacheResult<Vec<String>> {
        Ok(self.caches.read().await.keys().cloned().collect())
    }

    async fn has(&self, name: &str) -> CacheResult<bool> {
        Ok(self.caches.read().await.contains_key(name))
    }

    async fn delete(&self, name: &str) -> CacheResult<bool> {
        Ok(self.caches.write().await.remove(name).is_some())
    }

    async fn get(&self, name: &str, url: &str) -> CacheResult<Option<CachedEntry>> {
        let caches = self.caches.read().await;
        let entry = caches.get(name).and_then(|c| c.get(url));
        match entry {
            Some(entry) if entry.verify() => Ok(Some(entry.clone())),
            Some(_) => {
                tracing::warn!(cache = name, url, "Discarding cached entry with bad content hash");
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn put(&self, name: &str, entry: CachedEntry) -> CacheResult<()> {
        self.put_all(name, vec![entry]).await
    }

    async fn put_all(&self, name: &str, entries: Vec<CachedEntry>) -> CacheResult<()> {
        let mut caches = self.caches.write().await;
        self.check_quota(&caches, name, &entries)?;

        let cache = caches.entry(name.to_string()).or_default();
        for entry in entries {
            cache.insert(entry.url.clone(), entry);
        }
        Ok(())
    }

    async fn remove(&self, name: &str, url: &str) -> CacheResult<bool> {
        let mut caches = self.caches.write().await;
        Ok(caches
            .get_mut(name)
            .map(|c| c.remove(url).is_some())
            .unwrap_or(false))
    }

    async fn urls(&self, name: &str) -> CacheResult<Vec<String>> {
        Ok(self
            .caches
            .read()
            .await
            .get(name)
            .map(|c| c.keys().cloned().collect())
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use satchel_core::Response;

    fn entry(url: &str, body: &str) -> CachedEntry {
        CachedEntry::from_response(url, &Response::text(200, body.to_string()))
    }

    #[tokio::test]
    async fn test_put_creates_namespace() {
        let storage = MemoryCacheStorage::new();
        assert!(!storage.has("static-v1").await.unwrap());

        storage.put("static-v1", entry("https://kita.example/", "home")).await.unwrap();

        assert!(storage.has("static-v1").await.unwrap());
        let hit = storage.get("static-v1", "https://kita.example/").await.unwrap();
        assert_eq!(hit.unwrap().body, "home");
    }

    #[tokio::test]
    async fn test_match_any_searches_all_caches() {
        let storage = MemoryCacheStorage::new();
        storage.put("images-v1", entry("https://kita.example/a.png", "png")).await.unwrap();

        let hit = storage.match_any("https://kita.example/a.png").await.unwrap();
        assert!(hit.is_some());
        assert!(storage.match_any("https://kita.example/b.png").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_namespace() {
        let storage = MemoryCacheStorage::new();
        storage.put("dynamic-v0", entry("https://kita.example/api/x", "{}")).await.unwrap();

        assert!(storage.delete("dynamic-v0").await.unwrap());
        assert!(!storage.delete("dynamic-v0").await.unwrap());
        assert!(storage.keys().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_quota_rejects_oversized_write() {
        let storage = MemoryCacheStorage::with_quota(8);
        storage.put("dynamic-v1", entry("https://kita.example/a", "1234")).await.unwrap();

        let err = storage
            .put("dynamic-v1", entry("https://kita.example/b", "123456"))
            .await
            .unwrap_err();
        assert!(matches!(err, CacheError::QuotaExceeded(_)));

        // Overwriting the same key only counts the difference
        storage.put("dynamic-v1", entry("https://kita.example/a", "12345678")).await.unwrap();
    }

    #[tokio::test]
    async fn test_put_all_is_all_or_nothing() {
        let storage = MemoryCacheStorage::with_quota(5);
        let result = storage
            .put_all(
                "static-v1",
                vec![entry("https://kita.example/", "abc"), entry("https://kita.example/logo.png", "def")],
            )
            .await;

        assert!(result.is_err());
        assert!(!storage.has("static-v1").await.unwrap());
    }

    #[tokio::test]
    async fn test_stats() {
        let storage = MemoryCacheStorage::new();
        storage.put("static-v1", entry("https://kita.example/", "home")).await.unwrap();
        storage.put("images-v1", entry("https://kita.example/a.png", "png")).await.unwrap();

        let stats = storage.stats().await.unwrap();
        assert_eq!(stats.namespaces.len(), 2);
        assert_eq!(stats.entries(), 2);
        assert_eq!(stats.total_size(), 7);
    }
}
