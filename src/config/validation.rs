//! Configuration validation.
//!
//! Serde handles syntax; this checks value ranges. Every problem is
//! reported, not just the first one.

use std::fmt;
use std::net::SocketAddr;

use crate::config::schema::ProxyConfig;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Validate a configuration, collecting all errors.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("'{}' is not a socket address", config.listener.bind_address),
        ));
    }

    let transform = &config.transform;
    if transform.max_src_width == 0 {
        errors.push(ValidationError::new("transform.max_src_width", "must be > 0"));
    }
    if transform.max_inline_width == 0 {
        errors.push(ValidationError::new("transform.max_inline_width", "must be > 0"));
    }
    if !(1..=100).contains(&transform.image_quality) {
        errors.push(ValidationError::new(
            "transform.image_quality",
            format!("{} is outside 1-100", transform.image_quality),
        ));
    }

    if config.timeouts.connect_secs == 0 {
        errors.push(ValidationError::new("timeouts.connect_secs", "must be > 0"));
    }
    if config.timeouts.upstream_secs == 0 {
        errors.push(ValidationError::new("timeouts.upstream_secs", "must be > 0"));
    }
    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::new("timeouts.request_secs", "must be > 0"));
    }

    if config.limits.max_body_size == 0 {
        errors.push(ValidationError::new("limits.max_body_size", "must be > 0"));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!(
                "'{}' is not a socket address",
                config.observability.metrics_address
            ),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&ProxyConfig::default()).is_ok());
    }

    #[test]
    fn test_all_errors_reported() {
        let mut config = ProxyConfig::default();
        config.listener.bind_address = "not-an-address".into();
        config.transform.max_inline_width = 0;
        config.transform.image_quality = 0;

        let errors = validate_config(&config).unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field).collect();
        assert_eq!(
            fields,
            vec![
                "listener.bind_address",
                "transform.max_inline_width",
                "transform.image_quality"
            ]
        );
    }

    #[test]
    fn test_metrics_address_only_checked_when_enabled() {
        let mut config = ProxyConfig::default();
        config.observability.metrics_address = "nope".into();
        assert!(validate_config(&config).is_ok());

        config.observability.metrics_enabled = true;
        assert!(validate_config(&config).is_err());
    }
}
