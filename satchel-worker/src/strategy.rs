//! Strategy executors
//!
//! The three caching algorithms. Each either returns a response or an error
//! meaning "cache and network are both exhausted"; the caller hands that
//! error to the fallback responder.
//!
//! Cache writes are best effort: a failed write is logged and the network
//! response still goes back to the page.

use satchel_cache::{CacheNamespace, CacheStorage, CachedEntry, NamespaceSet};
use satchel_core::{Fetcher, Request, Response, SatchelError, SatchelResult};
use std::sync::Arc;
use tokio::task::JoinHandle;

use crate::router::Strategy;

/// Where a served response came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Network,
    Cache,
    Fallback,
}

/// A response plus its provenance
#[derive(Debug, Clone)]
pub struct Served {
    pub response: Response,
    pub source: Source,
}

impl Served {
    pub fn network(response: Response) -> Self {
        Self { response, source: Source::Network }
    }

    pub fn cache(response: Response) -> Self {
        Self { response, source: Source::Cache }
    }

    pub fn fallback(response: Response) -> Self {
        Self { response, source: Source::Fallback }
    }
}

/// Background revalidation started by stale-while-revalidate
pub type Revalidation = JoinHandle<SatchelResult<Response>>;

/// Strategy executors over one set of caches and one network
#[derive(Clone)]
pub struct Strategies {
    caches: Arc<dyn CacheStorage>,
    fetcher: Arc<dyn Fetcher>,
    namespaces: NamespaceSet,
}

impl Strategies {
    pub fn new(caches: Arc<dyn CacheStorage>, fetcher: Arc<dyn Fetcher>, namespaces: NamespaceSet) -> Self {
        Self {
            caches,
            fetcher,
            namespaces,
        }
    }

    pub async fn execute(&self, strategy: Strategy, request: &Request) -> SatchelResult<Served> {
        match strategy {
            Strategy::NetworkFirst => self.network_first(request).await,
            Strategy::CacheFirst => self.cache_first(request).await,
            Strategy::StaleWhileRevalidate => self.stale_while_revalidate(request).await,
        }
    }

    /// Network, falling back to the last good copy from any cache
    pub async fn network_first(&self, request: &Request) -> SatchelResult<Served> {
        let key = request.cache_key();

        match self.fetcher.fetch(request).await {
            Ok(response) => {
                let name = self.namespaces.name(CacheNamespace::Dynamic);
                store(self.caches.as_ref(), &name, &key, &response).await;
                Ok(Served::network(response))
            }
            Err(err) => {
                tracing::debug!(url = %key, error = %err, "Network failed, trying caches");
                match lookup_any(self.caches.as_ref(), &key).await {
                    Some(entry) => Ok(Served::cache(entry.to_response())),
                    None => Err(err),
                }
            }
        }
    }

    /// Cache without any network call on a hit; network fills the images cache on a miss
    pub async fn cache_first(&self, request: &Request) -> SatchelResult<Served> {
        let key = request.cache_key();
        let images = self.namespaces.name(CacheNamespace::Images);

        let hit = match self.caches.get(&images, &key).await {
            Ok(Some(entry)) => Some(entry),
            Ok(None) => lookup_any(self.caches.as_ref(), &key).await,
            Err(e) => {
                tracing::warn!(cache = %images, url = %key, error = %e, "Cache read failed");
                lookup_any(self.caches.as_ref(), &key).await
            }
        };
        if let Some(entry) = hit {
            tracing::debug!(url = %key, "Cache hit");
            return Ok(Served::cache(entry.to_response()));
        }

        let response = self.fetcher.fetch(request).await?;
        store(self.caches.as_ref(), &images, &key, &response).await;
        Ok(Served::network(response))
    }

    /// Cached copy immediately, refreshed in the background
    pub async fn stale_while_revalidate(&self, request: &Request) -> SatchelResult<Served> {
        let (served, _revalidation) = self.stale_while_revalidate_tracked(request).await?;
        Ok(served)
    }

    /// Like [`Self::stale_while_revalidate`], also returning the still
    /// running revalidation when a cached copy was served
    ///
    /// The revalidation's write is not ordered against other writes to the
    /// same key: whichever lands last wins. Entries are whole snapshots of
    /// the same URL, so either outcome is a valid cache state.
    pub async fn stale_while_revalidate_tracked(
        &self,
        request: &Request,
    ) -> SatchelResult<(Served, Option<Revalidation>)> {
        let key = request.cache_key();
        let cached = lookup_any(self.caches.as_ref(), &key).await;
        let revalidation = self.revalidate(request.clone());

        if let Some(entry) = cached {
            tracing::debug!(url = %key, "Serving stale copy, revalidating in background");
            return Ok((Served::cache(entry.to_response()), Some(revalidation)));
        }

        match revalidation.await {
            Ok(Ok(response)) => Ok((Served::network(response), None)),
            Ok(Err(err)) => Err(err),
            Err(join) => Err(SatchelError::Network(format!("revalidation aborted: {join}"))),
        }
    }

    fn revalidate(&self, request: Request) -> Revalidation {
        let caches = Arc::clone(&self.caches);
        let fetcher = Arc::clone(&self.fetcher);
        let name = self.namespaces.name(CacheNamespace::Dynamic);

        tokio::spawn(async move {
            let key = request.cache_key();
            let response = fetcher.fetch(&request).await.map_err(|err| {
                tracing::debug!(url = %key, error = %err, "Revalidation failed");
                err
            })?;
            store(caches.as_ref(), &name, &key, &response).await;
            Ok(response)
        })
    }
}

/// Snapshot an ok response into `name`; failures are logged only
pub(crate) async fn store(caches: &dyn CacheStorage, name: &str, key: &str, response: &Response) {
    if !response.is_ok() {
        tracing::debug!(url = key, status = response.status, "Not caching non-ok response");
        return;
    }
    let entry = CachedEntry::from_response(key, response);
    if let Err(e) = caches.put(name, entry).await {
        tracing::warn!(cache = name, url = key, error = %e, "Cache write failed");
    }
}

/// Lookup across every cache; read failures count as a miss
pub(crate) async fn lookup_any(caches: &dyn CacheStorage, key: &str) -> Option<CachedEntry> {
    match caches.match_any(key).await {
        Ok(hit) => hit,
        Err(e) => {
            tracing::warn!(url = key, error = %e, "Cache lookup failed");
            None
        }
    }
}
