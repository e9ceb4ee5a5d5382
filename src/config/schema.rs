//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the proxy.
//! All types derive Serde traits for deserialization from config files.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Root configuration for the proxy.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ProxyConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Content transformation settings.
    pub transform: TransformConfig,

    /// Friendly-host allow-list.
    pub allow_list: AllowListConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Upstream size limits.
    pub limits: LimitsConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// What the pipelines strip, resize and re-encode.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TransformConfig {
    /// Remove `<style>`, stylesheet links and `class`/`style` attributes.
    pub strip_css: bool,

    /// Remove `<script>` and unwrap `<noscript>`.
    pub strip_js: bool,

    /// Re-encode image responses and size inline `<img>` elements.
    pub minify_images: bool,

    /// Widest an image resource is re-encoded at, in pixels.
    pub max_src_width: u32,

    /// Widest an `<img>` is displayed inside a page, in pixels.
    pub max_inline_width: u32,

    /// JPEG quality (1-100) for re-encoded images.
    pub image_quality: u8,
}

impl Default for TransformConfig {
    fn default() -> Self {
        Self {
            strip_css: true,
            strip_js: true,
            minify_images: true,
            max_src_width: 800,
            max_inline_width: 608,
            image_quality: 50,
        }
    }
}

/// Allow-list file location.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AllowListConfig {
    /// Newline-separated hostname suffixes. No file means no friendly hosts.
    pub path: Option<PathBuf>,
}

/// Timeout configuration for various operations.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Upstream connection establishment timeout in seconds.
    pub connect_secs: u64,

    /// Total time allowed for one upstream fetch in seconds.
    pub upstream_secs: u64,

    /// Inbound request timeout (fetch + transform) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_secs: 5,
            upstream_secs: 30,
            request_secs: 60,
        }
    }
}

/// Upstream limits.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum upstream body size in bytes.
    pub max_body_size: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_body_size: 100 * 1024 * 1024, // 100 MiB
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}
