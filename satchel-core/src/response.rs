//! Responses returned to the page

use bytes::Bytes;

use crate::headers::Headers;

/// A fully buffered response
///
/// The body is an immutable, reference-counted buffer: cloning a response
/// to store it in a cache leaves the original intact for the page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    pub headers: Headers,
    pub body: Bytes,
}

impl Response {
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: Headers::new(),
            body: Bytes::new(),
        }
    }

    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    pub fn html(status: u16, body: impl Into<Bytes>) -> Self {
        Self::new(status)
            .with_header("Content-Type", "text/html; charset=utf-8")
            .with_body(body)
    }

    pub fn text(status: u16, body: impl Into<Bytes>) -> Self {
        Self::new(status)
            .with_header("Content-Type", "text/plain; charset=utf-8")
            .with_body(body)
    }

    /// 2xx status; only these are ever cached
    pub fn is_ok(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn content_type(&self) -> Option<&str> {
        self.headers.get("content-type")
    }

    pub fn len(&self) -> usize {
        self.body.len()
    }

    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_ok() {
        assert!(Response::new(200).is_ok());
        assert!(Response::new(204).is_ok());
        assert!(!Response::new(301).is_ok());
        assert!(!Response::new(404).is_ok());
        assert!(!Response::new(500).is_ok());
    }

    #[test]
    fn test_clone_shares_body() {
        let original = Response::html(200, "<p>Hallo</p>");
        let snapshot = original.clone();
        assert_eq!(original.body, snapshot.body);
        assert_eq!(snapshot.content_type(), Some("text/html; charset=utf-8"));
    }
}
