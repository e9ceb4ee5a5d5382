//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum router, timeout / request-id / trace layers)
//!     → request.rs (request ID, proxy target resolution)
//!     → transform::Pipeline (fetch + transform)
//!     → response.rs (Transformed / ProxyError → Response)
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::{resolve_target, MakeRequestUuidV4, X_REQUEST_ID};
pub use server::HttpServer;
