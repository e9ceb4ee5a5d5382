//! Upstream fetch subsystem.
//!
//! # Data Flow
//! ```text
//! transform::Pipeline
//!     → Fetch::fetch (GET, single attempt)
//!     → UpstreamResponse (status, content-type, body, final URL)
//! ```
//!
//! # Design Decisions
//! - `Fetch` is object safe so the pipeline holds an `Arc<dyn Fetch>`
//! - Bodies are buffered with a hard size cap while streaming
//! - No retries, no response caching

pub mod client;

#[cfg(test)]
pub(crate) mod mock;

use axum::http::StatusCode;
use futures_util::future::BoxFuture;
use thiserror::Error;
use url::Url;

pub use client::HttpFetcher;

/// Errors produced while talking to an upstream server.
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    /// Connection, DNS, TLS or timeout failure before a response arrived.
    #[error("Upstream request failed: {0}")]
    Connect(String),

    /// The response body could not be read to completion.
    #[error("Upstream body read failed: {0}")]
    Body(String),

    /// The response body exceeded the configured limit.
    #[error("Upstream body exceeded the maximum of {limit} bytes")]
    TooLarge { limit: usize },
}

/// A fully buffered upstream response.
#[derive(Debug, Clone)]
pub struct UpstreamResponse {
    /// URL the body was served from, after redirects.
    pub url: Url,
    pub status: StatusCode,
    /// Raw `content-type` header value, if upstream sent one.
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

/// Performs upstream GET requests.
pub trait Fetch: Send + Sync {
    fn fetch<'a>(&'a self, url: &'a Url) -> BoxFuture<'a, Result<UpstreamResponse, FetchError>>;
}
