//! Low-bandwidth forward HTTP proxy.
//!
//! Fetches pages on behalf of old or slow clients and slims them down:
//! https links are downgraded, scripts and styles stripped, images resized
//! and recompressed, and HTML/CSS minified.

pub mod cli;
pub mod config;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod transform;
pub mod upstream;

pub use config::schema::ProxyConfig;
pub use error::{ProxyError, ProxyResult};
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use transform::Pipeline;
