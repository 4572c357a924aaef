// SPDX-License-Identifier: AGPL-3.0-or-later
//! Cached response snapshots

use bytes::Bytes;
use chrono::{DateTime, Utc};
use satchel_core::{Headers, Response};
use serde::{Deserialize, Serialize};

use crate::codec::hash_content;

/// A stored (request key, response snapshot) pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedEntry {
    /// Normalized absolute URL of the GET request
    pub url: String,
    /// Response status
    pub status: u16,
    /// Response headers
    pub headers: Headers,
    /// Response body
    pub body: Bytes,
    /// BLAKE3 hash of the body at write time
    pub content_hash: String,
    /// When this entry was cached
    pub cached_at: DateTime<Utc>,
}

impl CachedEntry {
    /// Snapshot a response for storage under `url`
    pub fn from_response(url: impl Into<String>, response: &Response) -> Self {
        Self {
            url: url.into(),
            status: response.status,
            headers: response.headers.clone(),
            body: response.body.clone(),
            content_hash: hash_content(&response.body),
            cached_at: Utc::now(),
        }
    }

    /// Rebuild the response handed back to the page
    pub fn to_response(&self) -> Response {
        Response {
            status: self.status,
            headers: self.headers.clone(),
            body: self.body.clone(),
        }
    }

    /// Check the body still matches the hash recorded at write time
    pub fn verify(&self) -> bool {
        hash_content(&self.body) == self.content_hash
    }

    pub fn size(&self) -> u64 {
        self.body.len() as u64
    }
}
