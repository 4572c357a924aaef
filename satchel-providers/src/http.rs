//! HTTP fetcher
//!
//! Sends intercepted requests to the real network with reqwest.

use async_trait::async_trait;
use reqwest::{Client, Method as HttpMethod};
use satchel_core::{Fetcher, Headers, Method, Request, Response, SatchelError, SatchelResult};
use std::time::Duration;

/// HTTP fetcher configuration
#[derive(Debug, Clone, Default)]
pub struct HttpFetcherConfig {
    /// Per-request timeout; `None` leaves it to the platform
    pub timeout: Option<Duration>,
    /// Headers added to every request
    pub headers: Vec<(String, String)>,
}

/// Fetcher backed by a reqwest client
pub struct HttpFetcher {
    http: Client,
    config: HttpFetcherConfig,
}

impl HttpFetcher {
    pub fn new(config: HttpFetcherConfig) -> SatchelResult<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder
            .build()
            .map_err(|e| SatchelError::Network(e.to_string()))?;
        Ok(Self { http, config })
    }

    fn method(method: Method) -> HttpMethod {
        match method {
            Method::Get => HttpMethod::GET,
            Method::Head => HttpMethod::HEAD,
            Method::Post => HttpMethod::POST,
            Method::Put => HttpMethod::PUT,
            Method::Patch => HttpMethod::PATCH,
            Method::Delete => HttpMethod::DELETE,
            Method::Options => HttpMethod::OPTIONS,
        }
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, request: &Request) -> SatchelResult<Response> {
        let mut builder = self
            .http
            .request(Self::method(request.method), request.url.as_str());

        for (key, value) in &self.config.headers {
            builder = builder.header(key, value);
        }
        for (key, value) in request.headers.iter() {
            builder = builder.header(key, value);
        }
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                SatchelError::Timeout
            } else {
                SatchelError::Network(e.to_string())
            }
        })?;

        let status = response.status().as_u16();
        let headers: Headers = response
            .headers()
            .iter()
            .filter_map(|(k, v)| v.to_str().ok().map(|v| (k.as_str().to_string(), v.to_string())))
            .collect();

        let body = response
            .bytes()
            .await
            .map_err(|e| SatchelError::Network(e.to_string()))?;

        tracing::debug!(url = %request.url, status, bytes = body.len(), "Network response");

        Ok(Response {
            status,
            headers,
            body,
        })
    }
}
