//! Network fetch boundary

use async_trait::async_trait;
use std::sync::Arc;

use crate::{error::SatchelResult, request::Request, response::Response};

/// Issues requests to the network
///
/// `Err` means the network never answered (offline, connection reset,
/// timeout). A response with an error status is still `Ok`: the network
/// answered, the strategies decide whether it is worth caching.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, request: &Request) -> SatchelResult<Response>;
}

#[async_trait]
impl<F: Fetcher + ?Sized> Fetcher for Arc<F> {
    async fn fetch(&self, request: &Request) -> SatchelResult<Response> {
        (**self).fetch(request).await
    }
}

#[async_trait]
impl<F: Fetcher + ?Sized> Fetcher for Box<F> {
    async fn fetch(&self, request: &Request) -> SatchelResult<Response> {
        (**self).fetch(request).await
    }
}
