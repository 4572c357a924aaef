//! Error types for Satchel

use thiserror::Error;

/// Result type alias
pub type SatchelResult<T> = Result<T, SatchelError>;

/// Main error type
#[derive(Error, Debug)]
pub enum SatchelError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Unsupported method: {0}")]
    InvalidMethod(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Offline")]
    Offline,

    #[error("Timeout")]
    Timeout,

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Quota exceeded: {0}")]
    QuotaExceeded(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Install failed while fetching {url}: {reason}")]
    InstallFailed { url: String, reason: String },

    #[error("Submission rejected with status {0}")]
    Rejected(u16),

    #[error("Unknown sync tag: {0}")]
    UnknownSyncTag(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

impl SatchelError {
    /// The network did not answer at all (as opposed to answering with an error status)
    pub fn is_network_failure(&self) -> bool {
        matches!(
            self,
            SatchelError::Network(_) | SatchelError::Offline | SatchelError::Timeout
        )
    }

    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SatchelError::Network(_)
                | SatchelError::Offline
                | SatchelError::Timeout
                | SatchelError::Rejected(500..=599)
        )
    }
}

impl From<serde_json::Error> for SatchelError {
    fn from(e: serde_json::Error) -> Self {
        SatchelError::Serialization(e.to_string())
    }
}

impl From<url::ParseError> for SatchelError {
    fn from(e: url::ParseError) -> Self {
        SatchelError::InvalidUrl(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_network_failure() {
        assert!(SatchelError::Network("connection reset".into()).is_network_failure());
        assert!(SatchelError::Offline.is_network_failure());
        assert!(SatchelError::Timeout.is_network_failure());

        assert!(!SatchelError::Rejected(500).is_network_failure());
        assert!(!SatchelError::Storage("disk full".into()).is_network_failure());
    }

    #[test]
    fn test_is_retryable() {
        assert!(SatchelError::Offline.is_retryable());
        assert!(SatchelError::Rejected(503).is_retryable());

        assert!(!SatchelError::Rejected(422).is_retryable());
        assert!(!SatchelError::UnknownSyncTag("x".into()).is_retryable());
    }

    #[test]
    fn test_error_display() {
        let err = SatchelError::InstallFailed {
            url: "https://kita.example/logo.png".into(),
            reason: "status 404".into(),
        };
        assert_eq!(
            format!("{}", err),
            "Install failed while fetching https://kita.example/logo.png: status 404"
        );
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: SatchelError = io_err.into();
        assert!(matches!(err, SatchelError::Io(_)));
    }
}
