//! Request-scoped error taxonomy.
//!
//! Every error a request can hit ends up here and is converted into a
//! response at the handler boundary (see `http::response`).

use axum::http::StatusCode;
use thiserror::Error;

use crate::upstream::FetchError;

/// Errors that abort the transformation of a single request.
#[derive(Debug, Error)]
pub enum ProxyError {
    /// The inbound request did not name a usable upstream URL.
    #[error("Invalid proxy target: {0}")]
    InvalidTarget(String),

    /// The upstream fetch failed (network, DNS, body read, size limit).
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// Upstream answered without a `content-type` header.
    #[error("Upstream response has no content-type header")]
    MissingContentType,

    /// The stylesheet could not be parsed or printed.
    #[error("CSS minification failed: {0}")]
    Css(String),

    /// The image could not be decoded or re-encoded.
    #[error("Image transcoding failed: {0}")]
    Image(#[from] image::ImageError),

    /// A blocking transform task panicked or was cancelled.
    #[error("Transform task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl ProxyError {
    /// Status code sent to the client for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            ProxyError::InvalidTarget(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::BAD_GATEWAY,
        }
    }
}

/// Result type for request transformation.
pub type ProxyResult<T> = Result<T, ProxyError>;
