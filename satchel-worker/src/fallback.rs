//! Last-resort responses when cache and network both fail

use satchel_cache::CacheStorage;
use satchel_core::{Request, Response};
use std::sync::Arc;

use crate::strategy::{lookup_any, Served};

/// Fallback responder
///
/// Never fails: an HTML request gets the cached home page or a generated
/// offline page, anything else a plain 404.
#[derive(Clone)]
pub struct FallbackResponder {
    caches: Arc<dyn CacheStorage>,
    root_key: String,
    app_name: String,
}

impl FallbackResponder {
    pub fn new(caches: Arc<dyn CacheStorage>, root_key: impl Into<String>, app_name: impl Into<String>) -> Self {
        Self {
            caches,
            root_key: root_key.into(),
            app_name: app_name.into(),
        }
    }

    pub async fn respond(&self, request: &Request) -> Served {
        if !request.accepts_html() {
            tracing::debug!(url = %request.url, "No fallback for non-document request");
            return Served::fallback(Response::text(404, "Not available offline"));
        }

        if let Some(entry) = lookup_any(self.caches.as_ref(), &self.root_key).await {
            tracing::debug!(url = %request.url, "Serving cached home page as fallback");
            return Served::fallback(entry.to_response());
        }

        tracing::debug!(url = %request.url, "Serving generated offline page");
        Served::fallback(Response::html(200, offline_page(&self.app_name)))
    }
}

/// Self-contained offline document: inline styles, no external resources
pub fn offline_page(app_name: &str) -> String {
    let title = escape_html(app_name);
    format!(
        r#"<!DOCTYPE html>
<html lang="de">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>Offline - {title}</title>
<style>
  body {{ margin: 0; min-height: 100vh; display: flex; align-items: center; justify-content: center;
         font-family: system-ui, sans-serif; background: #fff8e7; color: #3d3d3d; }}
  main {{ max-width: 28rem; padding: 2rem; text-align: center; }}
  h1 {{ font-size: 1.5rem; margin-bottom: 0.5rem; }}
  button {{ margin-top: 1.5rem; padding: 0.75rem 1.5rem; border: 0; border-radius: 999px;
           background: #f4a261; color: #fff; font-size: 1rem; cursor: pointer; }}
</style>
</head>
<body>
<main>
  <h1>You are offline</h1>
  <p>{title} cannot be reached right now. Pages you visited before are still available.</p>
  <button type="button" onclick="window.location.reload()">Try again</button>
</main>
</body>
</html>
"#
    )
}

fn escape_html(raw: &str) -> String {
    raw.chars()
        .map(|c| match c {
            '<' => "&lt;".to_string(),
            '>' => "&gt;".to_string(),
            '&' => "&amp;".to_string(),
            '"' => "&quot;".to_string(),
            c => c.to_string(),
        })
        .collect()
}
