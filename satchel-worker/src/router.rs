//! Strategy router
//!
//! Decides, synchronously and without touching any cache, whether a request
//! is intercepted at all and which caching strategy serves it.

use satchel_core::Request;
use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

/// Caching strategy for an intercepted request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strategy {
    NetworkFirst,
    CacheFirst,
    StaleWhileRevalidate,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Strategy::NetworkFirst => "network-first",
            Strategy::CacheFirst => "cache-first",
            Strategy::StaleWhileRevalidate => "stale-while-revalidate",
        })
    }
}

/// Classification tables
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouteTable {
    /// Path prefixes always served network-first (API, serverless functions)
    pub network_first_prefixes: Vec<String>,
    /// Path fragments marking static media
    pub cache_first_markers: Vec<String>,
    /// File extensions (without the dot) served cache-first
    pub cache_first_extensions: Vec<String>,
}

impl Default for RouteTable {
    fn default() -> Self {
        Self {
            network_first_prefixes: vec!["/api/".into(), "/.netlify/functions/".into()],
            cache_first_markers: vec!["/images/".into(), "/fonts/".into(), "/logo.".into()],
            cache_first_extensions: ["jpg", "jpeg", "png", "gif", "webp", "svg", "woff", "woff2", "ttf", "eot"]
                .iter()
                .map(|e| e.to_string())
                .collect(),
        }
    }
}

impl RouteTable {
    /// Pure classification of a path and `Accept` header
    ///
    /// Order: API prefixes, static markers and extensions, HTML documents,
    /// then network-first as the default.
    pub fn classify(&self, path: &str, accept: Option<&str>) -> Strategy {
        if self
            .network_first_prefixes
            .iter()
            .any(|prefix| path.starts_with(prefix.as_str()))
        {
            return Strategy::NetworkFirst;
        }

        if self.is_static_asset(path) {
            return Strategy::CacheFirst;
        }

        if accept.map(|a| a.contains("text/html")).unwrap_or(false) {
            return Strategy::StaleWhileRevalidate;
        }

        Strategy::NetworkFirst
    }

    fn is_static_asset(&self, path: &str) -> bool {
        if self
            .cache_first_markers
            .iter()
            .any(|marker| path.contains(marker.as_str()))
        {
            return true;
        }

        let name = path.rsplit('/').next().unwrap_or(path).to_ascii_lowercase();
        match name.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() => self
                .cache_first_extensions
                .iter()
                .any(|e| e.eq_ignore_ascii_case(ext)),
            _ => false,
        }
    }
}

/// Fetch interception gate
#[derive(Debug, Clone)]
pub struct Router {
    origin: Url,
    table: RouteTable,
}

impl Router {
    pub fn new(origin: Url, table: RouteTable) -> Self {
        Self { origin, table }
    }

    pub fn table(&self) -> &RouteTable {
        &self.table
    }

    /// `None` means pass the request through untouched
    pub fn intercept(&self, request: &Request) -> Option<Strategy> {
        if !request.is_get() {
            tracing::trace!(method = %request.method, url = %request.url, "Passing through non-GET request");
            return None;
        }
        if !request.is_same_origin(&self.origin) {
            tracing::trace!(url = %request.url, "Passing through cross-origin request");
            return None;
        }

        let strategy = self.table.classify(request.path(), request.accept());
        tracing::debug!(url = %request.url, %strategy, "Routed request");
        Some(strategy)
    }
}
