//! Online/offline switch
//!
//! Wraps a fetcher so connectivity can be cut and restored at runtime, and
//! counts how many requests actually reached the wrapped fetcher.

use async_trait::async_trait;
use satchel_core::{Fetcher, Request, Response, SatchelError, SatchelResult};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Fetcher wrapper with a connectivity toggle
pub struct OfflineSwitch<F> {
    inner: F,
    online: AtomicBool,
    attempts: AtomicU64,
}

impl<F: Fetcher> OfflineSwitch<F> {
    pub fn new(inner: F) -> Self {
        Self {
            inner,
            online: AtomicBool::new(true),
            attempts: AtomicU64::new(0),
        }
    }

    pub fn set_online(&self, online: bool) {
        let was = self.online.swap(online, Ordering::SeqCst);
        if was != online {
            tracing::info!(online, "Connectivity changed");
        }
    }

    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }

    /// Requests attempted while online or offline
    pub fn attempts(&self) -> u64 {
        self.attempts.load(Ordering::SeqCst)
    }

    pub fn inner(&self) -> &F {
        &self.inner
    }
}

#[async_trait]
impl<F: Fetcher> Fetcher for OfflineSwitch<F> {
    async fn fetch(&self, request: &Request) -> SatchelResult<Response> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if !self.is_online() {
            return Err(SatchelError::Offline);
        }
        self.inner.fetch(request).await
    }
}
