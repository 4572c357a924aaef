//! Test doubles shared by the unit tests

use async_trait::async_trait;
use satchel_cache::{CacheError, CacheResult, CacheStorage, CachedEntry};
use satchel_core::{Fetcher, Request, Response, SatchelError, SatchelResult};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use tokio::sync::Semaphore;

enum Behaviour {
    Body(String),
    Status(u16),
    Offline,
    Hang,
    PerPath(HashMap<String, u16>),
}

/// Fetcher with a fixed answer that counts its calls
pub struct CountingFetcher {
    behaviour: Behaviour,
    calls: AtomicUsize,
    seen: Mutex<Vec<Request>>,
}

impl CountingFetcher {
    fn with(behaviour: Behaviour) -> Self {
        Self {
            behaviour,
            calls: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn ok(body: &str) -> Self {
        Self::with(Behaviour::Body(body.to_string()))
    }

    pub fn status(status: u16) -> Self {
        Self::with(Behaviour::Status(status))
    }

    pub fn offline() -> Self {
        Self::with(Behaviour::Offline)
    }

    pub fn hanging() -> Self {
        Self::with(Behaviour::Hang)
    }

    /// 200 for every path except those listed, which get the given status
    pub fn per_path(statuses: &[(&str, u16)]) -> Self {
        Self::with(Behaviour::PerPath(
            statuses.iter().map(|(p, s)| (p.to_string(), *s)).collect(),
        ))
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<Request> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl Fetcher for CountingFetcher {
    async fn fetch(&self, request: &Request) -> SatchelResult<Response> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().unwrap().push(request.clone());
        match &self.behaviour {
            Behaviour::Body(body) => Ok(Response::text(200, body.clone())),
            Behaviour::Status(status) => Ok(Response::text(*status, "error")),
            Behaviour::Offline => Err(SatchelError::Offline),
            Behaviour::Hang => std::future::pending().await,
            Behaviour::PerPath(statuses) => {
                let status = statuses.get(request.path()).copied().unwrap_or(200);
                Ok(Response::text(status, format!("body of {}", request.path())))
            }
        }
    }
}

/// Holds every fetch until `open` is called, then answers like `inner`
pub struct GatedFetcher {
    inner: CountingFetcher,
    gate: Semaphore,
}

impl GatedFetcher {
    pub fn new(inner: CountingFetcher) -> Self {
        Self {
            inner,
            gate: Semaphore::new(0),
        }
    }

    pub fn open(&self) {
        self.gate.add_permits(1);
    }
}

#[async_trait]
impl Fetcher for GatedFetcher {
    async fn fetch(&self, request: &Request) -> SatchelResult<Response> {
        // The permit goes back on drop, so one `open` releases every fetch
        let _permit = self.gate.acquire().await.map_err(|e| SatchelError::Other(e.to_string()))?;
        self.inner.fetch(request).await
    }
}

/// Cache storage where every operation fails
pub struct FailingCaches;

#[async_trait]
impl CacheStorage for FailingCaches {
    async fn keys(&self) -> CacheResult<Vec<String>> {
        Err(CacheError::Database("disk gone".into()))
    }

    async fn has(&self, _name: &str) -> CacheResult<bool> {
        Err(CacheError::Database("disk gone".into()))
    }

    async fn delete(&self, _name: &str) -> CacheResult<bool> {
        Err(CacheError::Database("disk gone".into()))
    }

    async fn get(&self, _name: &str, _url: &str) -> CacheResult<Option<CachedEntry>> {
        Err(CacheError::Database("disk gone".into()))
    }

    async fn put(&self, _name: &str, _entry: CachedEntry) -> CacheResult<()> {
        Err(CacheError::QuotaExceeded("0 bytes left".into()))
    }

    async fn put_all(&self, _name: &str, _entries: Vec<CachedEntry>) -> CacheResult<()> {
        Err(CacheError::QuotaExceeded("0 bytes left".into()))
    }

    async fn remove(&self, _name: &str, _url: &str) -> CacheResult<bool> {
        Err(CacheError::Database("disk gone".into()))
    }

    async fn urls(&self, _name: &str) -> CacheResult<Vec<String>> {
        Err(CacheError::Database("disk gone".into()))
    }
}
