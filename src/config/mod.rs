//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional)
//!     → loader.rs (parse & deserialize)
//!     → cli.rs overrides (port, --css, --js, --fullimages, ...)
//!     → validation.rs (semantic checks)
//!     → ProxyConfig (validated, immutable)
//!     → shared via Arc with the pipeline
//!
//! allow-list file
//!     → allow_list.rs (hostname suffixes, empty on failure)
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; there is no hot reload
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod allow_list;
pub mod loader;
pub mod schema;
pub mod validation;

pub use allow_list::AllowList;
pub use schema::ListenerConfig;
pub use schema::ProxyConfig;
pub use schema::TransformConfig;
