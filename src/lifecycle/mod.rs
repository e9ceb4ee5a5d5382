//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Validated config → allow-list → upstream client → pipeline → bind listener
//!
//! Shutdown (shutdown.rs):
//!     Trigger → stop accepting → drain in-flight requests → exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - Ordered startup: config first, then core, then listeners
//! - Any startup error is fatal; no error after startup stops the process

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;
pub use startup::{prepare, StartupError};
