//! Worker configuration
//!
//! Everything the worker needs to know about the site it serves. Loadable
//! from TOML; every field has a default matching the shipped site.

use satchel_cache::NamespaceSet;
use satchel_core::{SatchelError, SatchelResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use url::Url;

use crate::router::RouteTable;
use crate::sync::SyncKind;

/// Worker configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// Version tag embedded in every cache name
    pub version: String,
    /// The single origin this worker controls
    pub origin: Url,
    /// Display name used for notifications
    pub app_name: String,
    /// Paths fetched and cached at install, all or nothing
    pub precache: Vec<String>,
    /// Activate straight after install instead of waiting for old clients
    pub skip_waiting_on_install: bool,
    /// Request classification tables
    pub routes: RouteTable,
    /// Where queued submissions are replayed to
    pub sync: SyncEndpoints,
}

/// Submission endpoints, one per sync kind
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncEndpoints {
    pub registration: String,
    pub contact: String,
}

impl Default for SyncEndpoints {
    fn default() -> Self {
        Self {
            registration: "/api/registrations".into(),
            contact: "/api/contact".into(),
        }
    }
}

impl SyncEndpoints {
    pub fn path(&self, kind: SyncKind) -> &str {
        match kind {
            SyncKind::Registration => &self.registration,
            SyncKind::Contact => &self.contact,
        }
    }
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            version: "v1".into(),
            origin: Url::parse("http://localhost:3000/").expect("static URL is valid"),
            app_name: "Kita".into(),
            precache: vec!["/".into(), "/manifest.json".into(), "/logo.png".into()],
            skip_waiting_on_install: true,
            routes: RouteTable::default(),
            sync: SyncEndpoints::default(),
        }
    }
}

impl WorkerConfig {
    pub fn from_toml_str(raw: &str) -> SatchelResult<Self> {
        let config: Self = toml::from_str(raw).map_err(|e| SatchelError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a TOML file
    pub fn load(path: impl AsRef<Path>) -> SatchelResult<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&raw)
    }

    /// Load `path` if it exists, otherwise defaults
    pub fn load_or_default(path: impl AsRef<Path>) -> SatchelResult<Self> {
        if path.as_ref().exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Default config file location for this user
    pub fn default_path() -> PathBuf {
        directories::ProjectDirs::from("dev", "hyperpolymath", "satchel")
            .map(|d| d.config_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from("/tmp/satchel"))
            .join("satchel.toml")
    }

    fn validate(&self) -> SatchelResult<()> {
        if self.version.trim().is_empty() {
            return Err(SatchelError::Config("version must not be empty".into()));
        }
        if !matches!(self.origin.scheme(), "http" | "https") {
            return Err(SatchelError::Config(format!(
                "origin must be http or https, got {}",
                self.origin.scheme()
            )));
        }
        for path in self.precache.iter().chain(&self.routes.network_first_prefixes) {
            if !path.starts_with('/') {
                return Err(SatchelError::Config(format!("path {path:?} must start with '/'")));
            }
        }
        Ok(())
    }

    pub fn namespaces(&self) -> NamespaceSet {
        NamespaceSet::new(&self.version)
    }

    /// Resolve a site path against the origin
    pub fn url(&self, path: &str) -> SatchelResult<Url> {
        Ok(self.origin.join(path)?)
    }

    pub fn root_url(&self) -> SatchelResult<Url> {
        self.url("/")
    }

    pub fn precache_urls(&self) -> SatchelResult<Vec<Url>> {
        self.precache.iter().map(|p| self.url(p)).collect()
    }
}
