//! Messages crossing the page / worker boundary

use serde::{Deserialize, Serialize};

use crate::error::{SatchelError, SatchelResult};

/// Inbound `postMessage` payloads the worker understands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkerMessage {
    /// Activate a waiting worker regardless of open clients
    SkipWaiting,
}

impl WorkerMessage {
    pub fn from_json(raw: &str) -> SatchelResult<Self> {
        serde_json::from_str(raw).map_err(SatchelError::from)
    }

    pub fn to_json(&self) -> SatchelResult<String> {
        serde_json::to_string(self).map_err(SatchelError::from)
    }
}

/// Lifecycle state of one worker version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkerVersionState {
    /// Install step running (precaching)
    Installing,
    /// Installed, an older version still controls open pages
    Waiting,
    /// Controlling pages and handling fetches
    Active,
    /// Replaced by a newer version, or install failed
    Redundant,
}

/// Registration events observed by the page
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistrationEvent {
    /// A new version started installing
    UpdateFound { version: String },
    /// A version changed state
    StateChange {
        version: String,
        state: WorkerVersionState,
    },
    /// The active version now controlling open pages changed
    ControllerChange { version: String },
}
