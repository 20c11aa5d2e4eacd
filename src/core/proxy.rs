//! Proxy service implementation.
//!
//! Handles target resolution, upstream forwarding, response rewriting and the
//! responses the proxy serves itself.

pub mod headers;
pub mod response;
pub mod service;
pub mod upstream;

pub use service::{KeyProxy, RequestCtx};
pub use upstream::UpstreamTarget;
