//! Satchel Worker
//!
//! The offline engine that runs in place of a browser service worker:
//! request routing, the three caching strategies, the offline fallback,
//! install/activate lifecycle with versioned cache GC, and the background
//! sync queue for submissions that failed while offline.

pub mod config;
pub mod fallback;
pub mod lifecycle;
pub mod push;
pub mod registration;
pub mod router;
pub mod strategy;
pub mod sync;
pub mod worker;

#[cfg(test)]
pub(crate) mod testing;

pub use config::{SyncEndpoints, WorkerConfig};
pub use fallback::FallbackResponder;
pub use lifecycle::Lifecycle;
pub use push::Notification;
pub use registration::{Registration, SharedRegistration, WorkerVersion};
pub use router::{RouteTable, Router, Strategy};
pub use strategy::{Served, Source, Strategies};
pub use sync::{FetchSubmitter, PendingSyncItem, Submitter, SyncKind, SyncQueue, SyncReport};
pub use worker::{FetchOutcome, ServiceWorker};
