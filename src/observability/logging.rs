//! Structured logging.
//!
//! `RUST_LOG` wins over the configured level when it is set.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::schema::ObservabilityConfig;

/// Default filter directive for a configured level.
pub fn default_directive(level: &str) -> String {
    format!("lowband_proxy={level},tower_http={level}")
}

/// Install the global subscriber. Call once, before anything logs.
pub fn init(config: &ObservabilityConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_directive(&config.log_level).into());

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_directive() {
        assert_eq!(
            default_directive("debug"),
            "lowband_proxy=debug,tower_http=debug"
        );
        assert!(EnvFilter::try_new(default_directive("warn")).is_ok());
    }
}
