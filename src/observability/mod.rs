//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured tracing events)
//!     → metrics.rs (request counters, latency histograms, image resolutions)
//!
//! Consumers:
//!     → stdout (fmt subscriber)
//!     → Metrics endpoint (Prometheus scrape, off by default)
//! ```
//!
//! # Design Decisions
//! - Request ID flows through the tower-http layers into every span
//! - Metric macros are no-ops until a recorder is installed

pub mod logging;
pub mod metrics;
