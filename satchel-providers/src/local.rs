//! Local directory origin
//!
//! Answers requests from a static site build on disk, so the worker can be
//! exercised without a web server.

use async_trait::async_trait;
use satchel_core::{Fetcher, Method, Request, Response, SatchelError, SatchelResult};
use std::path::{Path, PathBuf};
use tokio::fs;

/// Serves files under `root`; `/` and directory paths map to `index.html`
pub struct LocalOrigin {
    root: PathBuf,
}

impl LocalOrigin {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn to_real_path(&self, url_path: &str) -> PathBuf {
        let mut real = self.root.clone();
        for seg in url_path.split('/').filter(|s| !s.is_empty()) {
            // Never walk out of the root
            if seg == ".." || seg == "." {
                continue;
            }
            real.push(seg);
        }
        if url_path.ends_with('/') || real == self.root {
            real.push("index.html");
        }
        real
    }
}

/// Content type from file extension
fn content_type(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    match ext.as_deref() {
        Some("html") | Some("htm") => "text/html; charset=utf-8",
        Some("css") => "text/css; charset=utf-8",
        Some("js") | Some("mjs") => "text/javascript; charset=utf-8",
        Some("json") => "application/json",
        Some("webmanifest") => "application/manifest+json",
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("svg") => "image/svg+xml",
        Some("ico") => "image/x-icon",
        Some("woff") => "font/woff",
        Some("woff2") => "font/woff2",
        Some("ttf") => "font/ttf",
        Some("eot") => "application/vnd.ms-fontobject",
        Some("txt") => "text/plain; charset=utf-8",
        _ => "application/octet-stream",
    }
}

#[async_trait]
impl Fetcher for LocalOrigin {
    async fn fetch(&self, request: &Request) -> SatchelResult<Response> {
        if !self.root.is_dir() {
            return Err(SatchelError::Network(format!(
                "origin directory {} is not reachable",
                self.root.display()
            )));
        }

        match request.method {
            Method::Get | Method::Head => {}
            Method::Post | Method::Put => {
                let size = request.body.as_ref().map(|b| b.len()).unwrap_or(0);
                tracing::info!(path = request.path(), size, "Local origin accepted submission");
                return Ok(Response::new(202));
            }
            _ => return Ok(Response::text(405, "Method Not Allowed")),
        }

        let real = self.to_real_path(request.path());
        if !real.is_file() {
            return Ok(Response::text(404, "Not Found"));
        }

        let data = fs::read(&real).await?;
        let response = Response::new(200).with_header("Content-Type", content_type(&real));

        if request.method == Method::Head {
            return Ok(response.with_header("Content-Length", data.len().to_string()));
        }
        Ok(response.with_body(data))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn site() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("index.html"), "<h1>Kita</h1>").unwrap();
        std::fs::create_dir_all(dir.path().join("images")).unwrap();
        std::fs::write(dir.path().join("images/garden.jpg"), [0xff, 0xd8, 0xff]).unwrap();
        dir
    }

    #[tokio::test]
    async fn test_root_serves_index() {
        let dir = site();
        let origin = LocalOrigin::new(dir.path());

        let response = origin.fetch(&Request::navigate("https://kita.example/").unwrap()).await.unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(response.content_type(), Some("text/html; charset=utf-8"));
        assert_eq!(response.body, "<h1>Kita</h1>");
    }

    #[tokio::test]
    async fn test_content_type_by_extension() {
        let dir = site();
        let origin = LocalOrigin::new(dir.path());

        let response = origin
            .fetch(&Request::get("https://kita.example/images/garden.jpg").unwrap())
            .await
            .unwrap();
        assert_eq!(response.content_type(), Some("image/jpeg"));
        assert_eq!(response.len(), 3);
    }

    #[tokio::test]
    async fn test_missing_file_is_404_not_network_error() {
        let dir = site();
        let origin = LocalOrigin::new(dir.path());

        let response = origin
            .fetch(&Request::get("https://kita.example/../../etc/passwd").unwrap())
            .await
            .unwrap();
        assert_eq!(response.status, 404);
    }

    #[tokio::test]
    async fn test_missing_root_is_network_error() {
        let origin = LocalOrigin::new("/definitely/not/here");
        let err = origin
            .fetch(&Request::get("https://kita.example/").unwrap())
            .await
            .unwrap_err();
        assert!(err.is_network_failure());
    }
}
