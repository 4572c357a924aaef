//! Install prompt gate
//!
//! Decides whether to offer installing the app, based on flags kept in the
//! durable key-value store under `pwa/`.

use chrono::{DateTime, Duration, Utc};
use satchel_cache::KeyValueStore;
use satchel_core::SatchelResult;
use std::sync::Arc;

use crate::platform::InstallCapabilities;

const VISIT_COUNT: &str = "pwa/visit-count";
const LAST_PROMPT: &str = "pwa/last-prompt";
const DISMISSED: &str = "pwa/dismissed";
const INSTALLED: &str = "pwa/installed";

pub const DEFAULT_MIN_VISITS: u32 = 2;
pub const DEFAULT_COOLDOWN_DAYS: i64 = 7;

/// Persisted prompt flags
#[derive(Clone)]
pub struct InstallPromptGate {
    store: Arc<dyn KeyValueStore>,
    min_visits: u32,
    cooldown: Duration,
}

impl InstallPromptGate {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            min_visits: DEFAULT_MIN_VISITS,
            cooldown: Duration::days(DEFAULT_COOLDOWN_DAYS),
        }
    }

    pub fn with_min_visits(mut self, visits: u32) -> Self {
        self.min_visits = visits;
        self
    }

    pub fn with_cooldown(mut self, cooldown: Duration) -> Self {
        self.cooldown = cooldown;
        self
    }

    pub fn visit_count(&self) -> SatchelResult<u32> {
        Ok(self
            .store
            .get_string(VISIT_COUNT)?
            .and_then(|v| v.parse().ok())
            .unwrap_or(0))
    }

    /// Count a page load; returns the new total
    pub fn record_visit(&self) -> SatchelResult<u32> {
        let visits = self.visit_count()?.saturating_add(1);
        self.store.insert_string(VISIT_COUNT, &visits.to_string())?;
        Ok(visits)
    }

    pub fn is_installed(&self) -> SatchelResult<bool> {
        self.flag(INSTALLED)
    }

    pub fn is_dismissed(&self) -> SatchelResult<bool> {
        self.flag(DISMISSED)
    }

    pub fn last_prompt(&self) -> SatchelResult<Option<DateTime<Utc>>> {
        Ok(self
            .store
            .get_string(LAST_PROMPT)?
            .and_then(|v| DateTime::parse_from_rfc3339(&v).ok())
            .map(|t| t.with_timezone(&Utc)))
    }

    /// Whether the install prompt may be shown at `now`
    pub fn should_show(&self, caps: &dyn InstallCapabilities, now: DateTime<Utc>) -> SatchelResult<bool> {
        if caps.is_standalone() || self.is_installed()? {
            return Ok(false);
        }
        if self.visit_count()? < self.min_visits {
            return Ok(false);
        }
        if self.is_dismissed()? {
            if let Some(last) = self.last_prompt()? {
                return Ok(now - last >= self.cooldown);
            }
        }
        Ok(true)
    }

    /// The prompt was displayed
    pub fn mark_prompted(&self, now: DateTime<Utc>) -> SatchelResult<()> {
        self.store.insert_string(LAST_PROMPT, &now.to_rfc3339())?;
        Ok(())
    }

    /// The user closed the prompt without installing
    pub fn dismiss(&self, now: DateTime<Utc>) -> SatchelResult<()> {
        tracing::debug!("Install prompt dismissed");
        self.store.insert_string(DISMISSED, "true")?;
        self.mark_prompted(now)
    }

    pub fn mark_installed(&self) -> SatchelResult<()> {
        tracing::info!("App installed");
        self.store.insert_string(INSTALLED, "true")?;
        Ok(())
    }

    fn flag(&self, key: &str) -> SatchelResult<bool> {
        Ok(self.store.get_string(key)?.as_deref() == Some("true"))
    }
}
