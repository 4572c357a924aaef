//! Background sync tags
//!
//! The closed set of sync registrations the page can fire and the worker
//! knows how to replay.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{SatchelError, SatchelResult};

/// Submission category, one per sync tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncKind {
    /// Urgent appointment registrations
    Registration,
    /// Contact form messages
    Contact,
}

impl SyncKind {
    pub const ALL: [SyncKind; 2] = [SyncKind::Registration, SyncKind::Contact];

    /// Tag the page registers with the sync manager
    pub fn tag(&self) -> &'static str {
        match self {
            SyncKind::Registration => "urgent-registration-sync",
            SyncKind::Contact => "contact-form-sync",
        }
    }

    pub fn from_tag(tag: &str) -> SatchelResult<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|k| k.tag() == tag)
            .ok_or_else(|| SatchelError::UnknownSyncTag(tag.to_string()))
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SyncKind::Registration => "registration",
            SyncKind::Contact => "contact",
        }
    }
}

impl fmt::Display for SyncKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SyncKind {
    type Err = SatchelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "registration" => Ok(SyncKind::Registration),
            "contact" => Ok(SyncKind::Contact),
            other => SyncKind::from_tag(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tags_round_trip() {
        for kind in SyncKind::ALL {
            assert_eq!(SyncKind::from_tag(kind.tag()).unwrap(), kind);
        }
        assert!(matches!(
            SyncKind::from_tag("newsletter-sync"),
            Err(SatchelError::UnknownSyncTag(_))
        ));
        assert_eq!("contact".parse::<SyncKind>().unwrap(), SyncKind::Contact);
    }

    #[test]
    fn test_display_matches_parse() {
        for kind in SyncKind::ALL {
            assert_eq!(kind.to_string().parse::<SyncKind>().unwrap(), kind);
            assert_eq!(kind.tag().parse::<SyncKind>().unwrap(), kind);
        }
    }
}
