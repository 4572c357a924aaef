//! Network fetchers for Satchel
//!
//! - http: real network via reqwest
//! - local: serves a site build directory as if it were the origin
//! - switch: wraps any fetcher with an online/offline toggle

mod local;
pub mod switch;

#[cfg(feature = "http")]
pub mod http;

pub use local::LocalOrigin;
pub use switch::OfflineSwitch;

#[cfg(feature = "http")]
pub use http::{HttpFetcher, HttpFetcherConfig};
