// SPDX-License-Identifier: AGPL-3.0-or-later
//! Cache error types

use satchel_core::SatchelError;
use thiserror::Error;

pub type CacheResult<T> = Result<T, CacheError>;

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(String),

    #[error("Quota exceeded: {0}")]
    QuotaExceeded(String),

    #[error("Corrupted entry: {0}")]
    CorruptedContent(String),

    #[error("Not found: {0}")]
    NotFound(String),
}

impl From<CacheError> for SatchelError {
    fn from(e: CacheError) -> Self {
        match e {
            CacheError::QuotaExceeded(msg) => SatchelError::QuotaExceeded(msg),
            CacheError::Serialization(msg) => SatchelError::Serialization(msg),
            CacheError::NotFound(msg) => SatchelError::NotFound(msg),
            other => SatchelError::Storage(other.to_string()),
        }
    }
}

impl From<rmp_serde::encode::Error> for CacheError {
    fn from(e: rmp_serde::encode::Error) -> Self {
        CacheError::Serialization(e.to_string())
    }
}

impl From<rmp_serde::decode::Error> for CacheError {
    fn from(e: rmp_serde::decode::Error) -> Self {
        CacheError::Serialization(e.to_string())
    }
}
