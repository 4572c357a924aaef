//! Background sync queue
//!
//! Form submissions that failed while offline are persisted here and
//! replayed when connectivity returns. Items live in the durable key-value
//! store, so they survive the worker being stopped between enqueue and sync.
//!
//! Key layout: `sync/{kind}/{enqueued_at_millis:020}/{id}`. Zero-padded
//! timestamps make lexicographic key order equal to enqueue order.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use satchel_cache::KeyValueStore;
use satchel_core::{Fetcher, Method, Request, SatchelError, SatchelResult};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use url::Url;
use uuid::Uuid;

use crate::config::SyncEndpoints;

pub use satchel_core::SyncKind;

const PREFIX: &str = "sync/";

/// A queued submission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingSyncItem {
    pub id: Uuid,
    pub kind: SyncKind,
    pub payload: serde_json::Value,
    pub enqueued_at: DateTime<Utc>,
    /// Failed replay attempts so far
    #[serde(default)]
    pub attempts: u32,
    #[serde(default)]
    pub last_error: Option<String>,
}

impl PendingSyncItem {
    pub fn key(&self) -> String {
        format!(
            "{PREFIX}{}/{:020}/{}",
            self.kind.as_str(),
            self.enqueued_at.timestamp_millis().max(0),
            self.id
        )
    }
}

/// Outcome of one replay run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
}

/// Replays one queued submission against the network
#[async_trait]
pub trait Submitter: Send + Sync {
    async fn submit(&self, item: &PendingSyncItem) -> SatchelResult<()>;
}

/// POSTs the payload as JSON to the kind's endpoint
pub struct FetchSubmitter {
    fetcher: Arc<dyn Fetcher>,
    origin: Url,
    endpoints: SyncEndpoints,
}

impl FetchSubmitter {
    pub fn new(fetcher: Arc<dyn Fetcher>, origin: Url, endpoints: SyncEndpoints) -> Self {
        Self {
            fetcher,
            origin,
            endpoints,
        }
    }
}

#[async_trait]
impl Submitter for FetchSubmitter {
    async fn submit(&self, item: &PendingSyncItem) -> SatchelResult<()> {
        let url = self.origin.join(self.endpoints.path(item.kind))?;
        let request = Request::new(Method::Post, url)
            .with_header("Content-Type", "application/json")
            .with_body(serde_json::to_vec(&item.payload)?);

        let response = self.fetcher.fetch(&request).await?;
        if !response.is_ok() {
            return Err(SatchelError::Rejected(response.status));
        }
        Ok(())
    }
}

/// Durable FIFO queue of pending submissions
#[derive(Clone)]
pub struct SyncQueue {
    store: Arc<dyn KeyValueStore>,
}

impl SyncQueue {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Persist a submission that could not be sent
    pub fn enqueue(&self, kind: SyncKind, payload: serde_json::Value) -> SatchelResult<PendingSyncItem> {
        let mut enqueued_at = Utc::now();
        // Keep keys strictly increasing when two items land in the same millisecond
        if let Some(last) = self.pending(Some(kind))?.last() {
            if enqueued_at.timestamp_millis() <= last.enqueued_at.timestamp_millis() {
                enqueued_at = last.enqueued_at + Duration::milliseconds(1);
            }
        }

        let item = PendingSyncItem {
            id: Uuid::new_v4(),
            kind,
            payload,
            enqueued_at,
            attempts: 0,
            last_error: None,
        };
        self.write(&item)?;
        tracing::info!(id = %item.id, %kind, "Queued submission for background sync");
        Ok(item)
    }

    /// Queued items in enqueue order, optionally of one kind
    pub fn pending(&self, kind: Option<SyncKind>) -> SatchelResult<Vec<PendingSyncItem>> {
        let prefix = match kind {
            Some(kind) => format!("{PREFIX}{}/", kind.as_str()),
            None => PREFIX.to_string(),
        };

        let mut items = Vec::new();
        for (key, value) in self.store.scan_prefix(&prefix)? {
            match serde_json::from_slice::<PendingSyncItem>(&value) {
                Ok(item) => items.push(item),
                Err(e) => tracing::warn!(%key, error = %e, "Skipping unreadable sync item"),
            }
        }
        if kind.is_none() {
            items.sort_by_key(|i| (i.enqueued_at, i.id));
        }
        Ok(items)
    }

    pub fn len(&self) -> SatchelResult<usize> {
        Ok(self.pending(None)?.len())
    }

    pub fn is_empty(&self) -> SatchelResult<bool> {
        Ok(self.len()? == 0)
    }

    pub fn remove(&self, item: &PendingSyncItem) -> SatchelResult<bool> {
        Ok(self.store.remove(&item.key())?)
    }

    /// Submit every queued item of `kind`
    ///
    /// Successful items are removed. Failed ones stay queued with their
    /// attempt count bumped; a failure never stops the remaining items.
    pub async fn replay(&self, kind: SyncKind, submitter: &dyn Submitter) -> SatchelResult<SyncReport> {
        let items = self.pending(Some(kind))?;
        let mut report = SyncReport::default();

        for mut item in items {
            report.attempted += 1;
            match submitter.submit(&item).await {
                Ok(()) => match self.remove(&item) {
                    Ok(_) => {
                        report.succeeded += 1;
                        tracing::info!(id = %item.id, %kind, "Replayed queued submission");
                    }
                    Err(e) => {
                        // Sent, but it will be sent again on the next sync
                        report.failed += 1;
                        tracing::warn!(id = %item.id, %kind, error = %e, "Replayed submission could not be dequeued");
                    }
                },
                Err(e) => {
                    report.failed += 1;
                    tracing::warn!(id = %item.id, %kind, error = %e, "Replay failed, keeping item");
                    item.attempts += 1;
                    item.last_error = Some(e.to_string());
                    if let Err(e) = self.write(&item) {
                        tracing::warn!(id = %item.id, %kind, error = %e, "Could not record failed attempt");
                    }
                }
            }
        }

        tracing::info!(
            %kind,
            attempted = report.attempted,
            succeeded = report.succeeded,
            failed = report.failed,
            "Background sync finished"
        );
        Ok(report)
    }

    fn write(&self, item: &PendingSyncItem) -> SatchelResult<()> {
        let value = serde_json::to_vec(item)?;
        self.store.insert(&item.key(), &value)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::CountingFetcher;
    use satchel_cache::{CacheError, CacheResult, MemoryKv};
    use serde_json::json;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;

    /// Fails the n-th submission (0-based), records every payload
    struct FailNth {
        fail: usize,
        seen: Mutex<Vec<serde_json::Value>>,
    }

    #[async_trait]
    impl Submitter for FailNth {
        async fn submit(&self, item: &PendingSyncItem) -> SatchelResult<()> {
            let mut seen = self.seen.lock().unwrap();
            let index = seen.len();
            seen.push(item.payload.clone());
            if index == self.fail {
                Err(SatchelError::Rejected(503))
            } else {
                Ok(())
            }
        }
    }

    fn queue() -> SyncQueue {
        SyncQueue::new(Arc::new(MemoryKv::new()))
    }

    /// Reads and removes work; inserts fail once `full` is set
    #[derive(Default)]
    struct FullStore {
        inner: MemoryKv,
        full: AtomicBool,
    }

    impl KeyValueStore for FullStore {
        fn get(&self, key: &str) -> CacheResult<Option<Vec<u8>>> {
            self.inner.get(key)
        }

        fn insert(&self, key: &str, value: &[u8]) -> CacheResult<()> {
            if self.full.load(Ordering::SeqCst) {
                return Err(CacheError::QuotaExceeded("full".into()));
            }
            self.inner.insert(key, value)
        }

        fn remove(&self, key: &str) -> CacheResult<bool> {
            self.inner.remove(key)
        }

        fn scan_prefix(&self, prefix: &str) -> CacheResult<Vec<(String, Vec<u8>)>> {
            self.inner.scan_prefix(prefix)
        }
    }

    #[test]
    fn test_enqueue_is_fifo() {
        let queue = queue();
        for n in 0..5 {
            queue.enqueue(SyncKind::Registration, json!({ "n": n })).unwrap();
        }
        let order: Vec<_> = queue
            .pending(Some(SyncKind::Registration))
            .unwrap()
            .into_iter()
            .map(|i| i.payload["n"].as_i64().unwrap())
            .collect();
        assert_eq!(order, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_kinds_are_separate() {
        let queue = queue();
        queue.enqueue(SyncKind::Registration, json!({ "child": "Mila" })).unwrap();
        queue.enqueue(SyncKind::Contact, json!({ "msg": "Hallo" })).unwrap();

        assert_eq!(queue.pending(Some(SyncKind::Contact)).unwrap().len(), 1);
        assert_eq!(queue.len().unwrap(), 2);
    }

    #[tokio::test]
    async fn test_failed_item_stays_others_removed() {
        let queue = queue();
        queue.enqueue(SyncKind::Registration, json!({ "n": 1 })).unwrap();
        queue.enqueue(SyncKind::Registration, json!({ "n": 2 })).unwrap();
        queue.enqueue(SyncKind::Registration, json!({ "n": 3 })).unwrap();
        let submitter = FailNth {
            fail: 1,
            seen: Mutex::new(Vec::new()),
        };

        let report = queue.replay(SyncKind::Registration, &submitter).await.unwrap();

        assert_eq!(
            report,
            SyncReport {
                attempted: 3,
                succeeded: 2,
                failed: 1
            }
        );
        let left = queue.pending(None).unwrap();
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].payload, json!({ "n": 2 }));
        assert_eq!(left[0].attempts, 1);
        assert!(left[0].last_error.as_deref().unwrap().contains("503"));
    }

    #[tokio::test]
    async fn test_store_failure_does_not_stop_replay() {
        let store = Arc::new(FullStore::default());
        let queue = SyncQueue::new(store.clone());
        for n in 1..=3 {
            queue.enqueue(SyncKind::Contact, json!({ "n": n })).unwrap();
        }
        store.full.store(true, Ordering::SeqCst);
        let submitter = FailNth {
            fail: 0,
            seen: Mutex::new(Vec::new()),
        };

        let report = queue.replay(SyncKind::Contact, &submitter).await.unwrap();

        assert_eq!(submitter.seen.lock().unwrap().len(), 3);
        assert_eq!(
            report,
            SyncReport {
                attempted: 3,
                succeeded: 2,
                failed: 1
            }
        );
        let left = queue.pending(None).unwrap();
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].payload, json!({ "n": 1 }));
        // The bump could not be written
        assert_eq!(left[0].attempts, 0);
    }

    #[tokio::test]
    async fn test_replay_only_touches_its_kind() {
        let queue = queue();
        queue.enqueue(SyncKind::Contact, json!({ "msg": "Hallo" })).unwrap();
        let submitter = FailNth {
            fail: usize::MAX,
            seen: Mutex::new(Vec::new()),
        };

        let report = queue.replay(SyncKind::Registration, &submitter).await.unwrap();
        assert_eq!(report.attempted, 0);
        assert_eq!(queue.len().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_fetch_submitter_posts_json() {
        let fetcher = Arc::new(CountingFetcher::status(201));
        let submitter = FetchSubmitter::new(
            fetcher.clone(),
            Url::parse("https://kita.example/").unwrap(),
            SyncEndpoints::default(),
        );
        let queue = queue();
        let item = queue.enqueue(SyncKind::Contact, json!({ "msg": "Hallo" })).unwrap();

        submitter.submit(&item).await.unwrap();

        let sent = &fetcher.requests()[0];
        assert_eq!(sent.method, Method::Post);
        assert_eq!(sent.url.as_str(), "https://kita.example/api/contact");
        assert_eq!(sent.headers.get("content-type"), Some("application/json"));
        assert_eq!(sent.body.as_deref(), Some(br#"{"msg":"Hallo"}"#.as_slice()));
    }

    #[tokio::test]
    async fn test_fetch_submitter_rejects_error_status() {
        let submitter = FetchSubmitter::new(
            Arc::new(CountingFetcher::status(500)),
            Url::parse("https://kita.example/").unwrap(),
            SyncEndpoints::default(),
        );
        let item = queue().enqueue(SyncKind::Registration, json!({})).unwrap();

        let err = submitter.submit(&item).await.unwrap_err();
        assert!(matches!(err, SatchelError::Rejected(500)));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_offline_submitter_keeps_everything() {
        let submitter = FetchSubmitter::new(
            Arc::new(CountingFetcher::offline()),
            Url::parse("https://kita.example/").unwrap(),
            SyncEndpoints::default(),
        );
        let queue = queue();
        queue.enqueue(SyncKind::Contact, json!({ "a": 1 })).unwrap();
        queue.enqueue(SyncKind::Contact, json!({ "b": 2 })).unwrap();

        let report = queue.replay(SyncKind::Contact, &submitter).await.unwrap();
        assert_eq!(report.failed, 2);
        assert_eq!(queue.len().unwrap(), 2);
    }
}
