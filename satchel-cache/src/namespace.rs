// SPDX-License-Identifier: AGPL-3.0-or-later
//! Cache namespaces
//!
//! Three logical caches, each named with the app version so that shipping a
//! new version orphans the previous names for activate-time collection.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Logical purpose of a cache
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheNamespace {
    /// Immutable app shell assets, filled at install
    Static,
    /// Network-first HTML and API responses
    Dynamic,
    /// Cache-first media
    Images,
}

impl CacheNamespace {
    pub const ALL: [CacheNamespace; 3] = [
        CacheNamespace::Static,
        CacheNamespace::Dynamic,
        CacheNamespace::Images,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CacheNamespace::Static => "static",
            CacheNamespace::Dynamic => "dynamic",
            CacheNamespace::Images => "images",
        }
    }
}

impl fmt::Display for CacheNamespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The concrete cache names for one app version
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamespaceSet {
    version: String,
}

impl NamespaceSet {
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
        }
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn name(&self, namespace: CacheNamespace) -> String {
        format!("{}-{}", namespace.as_str(), self.version)
    }

    /// Current names, in `CacheNamespace::ALL` order
    pub fn names(&self) -> Vec<String> {
        CacheNamespace::ALL.iter().map(|ns| self.name(*ns)).collect()
    }

    pub fn is_current(&self, name: &str) -> bool {
        self.resolve(name).is_some()
    }

    /// Map a concrete name back to its purpose, if it belongs to this version
    pub fn resolve(&self, name: &str) -> Option<CacheNamespace> {
        CacheNamespace::ALL
            .iter()
            .copied()
            .find(|ns| self.name(*ns) == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_versioned_names() {
        let set = NamespaceSet::new("v2");
        assert_eq!(set.name(CacheNamespace::Static), "static-v2");
        assert_eq!(set.name(CacheNamespace::Dynamic), "dynamic-v2");
        assert_eq!(set.name(CacheNamespace::Images), "images-v2");
        assert_eq!(set.names().len(), 3);
    }

    #[test]
    fn test_old_version_not_current() {
        let set = NamespaceSet::new("v2");
        assert!(set.is_current("images-v2"));
        assert!(!set.is_current("images-v1"));
        assert!(!set.is_current("static-v2-old"));
        assert_eq!(set.resolve("dynamic-v2"), Some(CacheNamespace::Dynamic));
    }
}
