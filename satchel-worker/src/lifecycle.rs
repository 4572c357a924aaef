//! Install and activate steps
//!
//! Install precaches the application shell all-or-nothing. Activate
//! garbage-collects every cache that does not belong to the current version.

use futures::future::join_all;
use satchel_cache::{CacheNamespace, CacheStorage, CachedEntry, NamespaceSet};
use satchel_core::{Fetcher, Method, Request, SatchelError, SatchelResult};
use std::sync::Arc;
use url::Url;

/// Install/activate controller for one worker version
#[derive(Clone)]
pub struct Lifecycle {
    caches: Arc<dyn CacheStorage>,
    fetcher: Arc<dyn Fetcher>,
    namespaces: NamespaceSet,
    precache: Vec<Url>,
}

impl Lifecycle {
    pub fn new(
        caches: Arc<dyn CacheStorage>,
        fetcher: Arc<dyn Fetcher>,
        namespaces: NamespaceSet,
        precache: Vec<Url>,
    ) -> Self {
        Self {
            caches,
            fetcher,
            namespaces,
            precache,
        }
    }

    pub fn namespaces(&self) -> &NamespaceSet {
        &self.namespaces
    }

    /// Fetch and store the precache manifest
    ///
    /// Every URL must answer with an ok status. On any failure nothing is
    /// written and the error names the first URL that failed. Returns the
    /// number of entries stored.
    pub async fn install(&self) -> SatchelResult<usize> {
        let name = self.namespaces.name(CacheNamespace::Static);
        tracing::info!(cache = %name, urls = self.precache.len(), "Installing");

        let fetches = self.precache.iter().map(|url| {
            let fetcher = Arc::clone(&self.fetcher);
            let request = Request::new(Method::Get, url.clone());
            async move {
                let key = request.cache_key();
                match fetcher.fetch(&request).await {
                    Ok(response) if response.is_ok() => Ok(CachedEntry::from_response(key, &response)),
                    Ok(response) => Err(SatchelError::InstallFailed {
                        url: key,
                        reason: format!("status {}", response.status),
                    }),
                    Err(e) => Err(SatchelError::InstallFailed {
                        url: key,
                        reason: e.to_string(),
                    }),
                }
            }
        });

        let entries = join_all(fetches)
            .await
            .into_iter()
            .collect::<SatchelResult<Vec<_>>>()
            .map_err(|e| {
                tracing::error!(error = %e, "Precache failed, install aborted");
                e
            })?;

        let count = entries.len();
        self.caches.put_all(&name, entries).await.map_err(|e| {
            tracing::error!(cache = %name, error = %e, "Precache write failed, install aborted");
            SatchelError::from(e)
        })?;

        tracing::info!(cache = %name, entries = count, "Install complete");
        Ok(count)
    }

    /// Delete every cache that is not part of the current version
    ///
    /// Returns the deleted names; running it again deletes nothing.
    pub async fn activate(&self) -> SatchelResult<Vec<String>> {
        let mut deleted = Vec::new();
        for name in self.caches.keys().await? {
            if self.namespaces.is_current(&name) {
                continue;
            }
            if self.caches.delete(&name).await? {
                tracing::info!(cache = %name, "Deleted outdated cache");
                deleted.push(name);
            }
        }
        tracing::info!(version = self.namespaces.version(), deleted = deleted.len(), "Activated");
        Ok(deleted)
    }

    /// Delete all caches of the current version
    pub async fn clear_caches(&self) -> SatchelResult<Vec<String>> {
        let mut cleared = Vec::new();
        for name in self.namespaces.names() {
            if self.caches.delete(&name).await? {
                cleared.push(name);
            }
        }
        tracing::info!(cleared = cleared.len(), "Cleared caches");
        Ok(cleared)
    }
}
