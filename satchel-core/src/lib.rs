//! Satchel Core
//!
//! Core types shared by the service worker and the page-side coordinator:
//! the request/response model, the network fetch boundary, and the messages
//! that cross between page and worker.

pub mod error;
pub mod fetch;
pub mod headers;
pub mod message;
pub mod request;
pub mod response;
pub mod sync;

pub use error::{SatchelError, SatchelResult};
pub use fetch::Fetcher;
pub use headers::Headers;
pub use message::{RegistrationEvent, WorkerMessage, WorkerVersionState};
pub use request::{Method, Request};
pub use response::Response;
pub use sync::SyncKind;
