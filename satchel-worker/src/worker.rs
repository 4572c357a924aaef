// SPDX-License-Identifier: AGPL-3.0-or-later
//! Worker event dispatch
//!
//! One [`ServiceWorker`] is one version of the worker script. Its handlers
//! mirror the events the platform delivers: install, activate, message,
//! fetch, sync and push. Every version of the same site shares one
//! [`SharedRegistration`], the cache storage and the durable key-value store.

use satchel_cache::{CacheStorage, KeyValueStore};
use satchel_core::request::cache_key;
use satchel_core::{Fetcher, Request, SatchelResult, WorkerMessage, WorkerVersionState};
use std::sync::Arc;

use crate::config::WorkerConfig;
use crate::fallback::FallbackResponder;
use crate::lifecycle::Lifecycle;
use crate::push::{notification_for, Notification};
use crate::registration::SharedRegistration;
use crate::router::Router;
use crate::strategy::{Served, Strategies};
use crate::sync::{FetchSubmitter, PendingSyncItem, Submitter, SyncKind, SyncQueue, SyncReport};

/// What the worker did with a fetch
#[derive(Debug, Clone)]
pub enum FetchOutcome {
    /// Not intercepted; the page talks to the network directly
    PassThrough,
    Respond(Served),
}

impl FetchOutcome {
    pub fn served(&self) -> Option<&Served> {
        match self {
            FetchOutcome::PassThrough => None,
            FetchOutcome::Respond(served) => Some(served),
        }
    }
}

/// One worker version
pub struct ServiceWorker {
    config: WorkerConfig,
    router: Router,
    strategies: Strategies,
    fallback: FallbackResponder,
    lifecycle: Lifecycle,
    registration: SharedRegistration,
    queue: SyncQueue,
    submitter: Arc<dyn Submitter>,
}

impl ServiceWorker {
    pub fn new(
        config: WorkerConfig,
        caches: Arc<dyn CacheStorage>,
        fetcher: Arc<dyn Fetcher>,
        store: Arc<dyn KeyValueStore>,
        registration: SharedRegistration,
    ) -> SatchelResult<Self> {
        let namespaces = config.namespaces();
        let root_key = cache_key(&config.root_url()?);

        Ok(Self {
            router: Router::new(config.origin.clone(), config.routes.clone()),
            strategies: Strategies::new(Arc::clone(&caches), Arc::clone(&fetcher), namespaces.clone()),
            fallback: FallbackResponder::new(Arc::clone(&caches), root_key, config.app_name.clone()),
            lifecycle: Lifecycle::new(caches, Arc::clone(&fetcher), namespaces, config.precache_urls()?),
            registration,
            queue: SyncQueue::new(store),
            submitter: Arc::new(FetchSubmitter::new(fetcher, config.origin.clone(), config.sync.clone())),
            config,
        })
    }

    /// Replace the default network submitter used for background sync
    pub fn with_submitter(mut self, submitter: Arc<dyn Submitter>) -> Self {
        self.submitter = submitter;
        self
    }

    pub fn version(&self) -> &str {
        &self.config.version
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    pub fn queue(&self) -> &SyncQueue {
        &self.queue
    }

    pub fn registration(&self) -> &SharedRegistration {
        &self.registration
    }

    /// Install this version, then activate it if nothing holds it back
    ///
    /// Returns the state this version ended up in. A version replaced by a
    /// newer install while it was still precaching ends up `Redundant`.
    pub async fn handle_install(&self) -> SatchelResult<WorkerVersionState> {
        self.registration.lock().await.update(self.version());

        if let Err(e) = self.lifecycle.install().await {
            self.registration.lock().await.install_failed(self.version());
            return Err(e);
        }

        {
            let mut registration = self.registration.lock().await;
            if let Err(e) = registration.install_complete(self.version()) {
                tracing::warn!(version = self.version(), error = %e, "Install finished after being superseded");
                return Ok(WorkerVersionState::Redundant);
            }
            if self.config.skip_waiting_on_install {
                registration.skip_waiting();
            }
        }

        if self.try_activate().await? {
            Ok(WorkerVersionState::Active)
        } else {
            Ok(WorkerVersionState::Waiting)
        }
    }

    /// Activate this version if it is waiting and allowed to take over
    pub async fn try_activate(&self) -> SatchelResult<bool> {
        {
            let mut registration = self.registration.lock().await;
            let is_mine = registration
                .waiting()
                .map(|w| w.version == self.config.version)
                .unwrap_or(false);
            if !is_mine || !registration.can_activate() {
                return Ok(false);
            }
            registration.activate()?;
        }
        self.handle_activate().await?;
        Ok(true)
    }

    /// Garbage-collect outdated caches and claim open pages
    pub async fn handle_activate(&self) -> SatchelResult<Vec<String>> {
        let deleted = self.lifecycle.activate().await?;
        let mut registration = self.registration.lock().await;
        if registration.active().is_some() {
            registration.claim()?;
        }
        Ok(deleted)
    }

    /// Handle a page message; returns whether this version activated
    pub async fn handle_message(&self, message: WorkerMessage) -> SatchelResult<bool> {
        match message {
            WorkerMessage::SkipWaiting => {
                tracing::info!(version = self.version(), "Skip waiting requested");
                self.registration.lock().await.skip_waiting();
                self.try_activate().await
            }
        }
    }

    pub async fn handle_message_json(&self, raw: &str) -> SatchelResult<bool> {
        self.handle_message(WorkerMessage::from_json(raw)?).await
    }

    /// Answer a fetch; never fails once intercepted
    pub async fn handle_fetch(&self, request: &Request) -> FetchOutcome {
        let Some(strategy) = self.router.intercept(request) else {
            return FetchOutcome::PassThrough;
        };

        match self.strategies.execute(strategy, request).await {
            Ok(served) => FetchOutcome::Respond(served),
            Err(e) => {
                tracing::debug!(url = %request.url, %strategy, error = %e, "Strategy exhausted, using fallback");
                FetchOutcome::Respond(self.fallback.respond(request).await)
            }
        }
    }

    /// Replay queued submissions for a sync tag
    pub async fn handle_sync(&self, tag: &str) -> SatchelResult<SyncReport> {
        let kind = SyncKind::from_tag(tag)?;
        self.queue.replay(kind, self.submitter.as_ref()).await
    }

    pub fn handle_push(&self, payload: Option<&[u8]>) -> Notification {
        notification_for(payload, &self.config.origin, &self.config.app_name)
    }

    /// Queue a submission that failed offline
    pub fn enqueue(&self, kind: SyncKind, payload: serde_json::Value) -> SatchelResult<PendingSyncItem> {
        self.queue.enqueue(kind, payload)
    }

    /// Delete every cache of this version
    pub async fn clear_caches(&self) -> SatchelResult<Vec<String>> {
        self.lifecycle.clear_caches().await
    }

    pub async fn client_opened(&self) {
        self.registration.lock().await.client_opened();
    }

    /// A page closed; a waiting version may now take over
    pub async fn client_closed(&self) -> SatchelResult<bool> {
        self.registration.lock().await.client_closed();
        self.try_activate().await
    }
}
