//! Content transformation subsystem.
//!
//! # Data Flow
//! ```text
//! target URL
//!     → upstream::Fetch (single GET)
//!     → context.rs (RequestContext: final URL, origin, friendly flag)
//!     → dispatch.rs (content-type → Route)
//!     → html.rs | css.rs | transcode.rs | passthrough
//!     → Transformed (status, content-type, body)
//! ```
//!
//! # Design Decisions
//! - Pipelines are free functions over immutable config; no global state
//! - The only mutable state is the per-request dimension cache
//! - CPU-heavy image work runs on the blocking pool

pub mod context;
pub mod css;
pub mod css_hacks;
pub mod dimensions;
pub mod dispatch;
pub mod dom;
pub mod html;
pub mod links;
pub mod transcode;

use std::sync::Arc;

use axum::http::StatusCode;
use url::Url;

use crate::config::{AllowList, TransformConfig};
use crate::error::ProxyResult;
use crate::upstream::Fetch;

pub use context::RequestContext;
pub use dispatch::Route;

const HTML_CONTENT_TYPE: &str = "text/html; charset=utf-8";
const CSS_CONTENT_TYPE: &str = "text/css; charset=utf-8";

/// Result of running one request through the pipelines.
#[derive(Debug)]
pub struct Transformed {
    pub route: Route,
    pub status: StatusCode,
    pub content_type: String,
    pub body: Vec<u8>,
}

/// Fetches a target and runs the matching pipeline.
///
/// Shared by all requests; holds only read-only state.
pub struct Pipeline {
    config: Arc<TransformConfig>,
    allow_list: AllowList,
    fetcher: Arc<dyn Fetch>,
}

impl Pipeline {
    pub fn new(config: TransformConfig, allow_list: AllowList, fetcher: Arc<dyn Fetch>) -> Self {
        Self {
            config: Arc::new(config),
            allow_list,
            fetcher,
        }
    }

    /// Fetch `target` and transform the response.
    pub async fn process(&self, target: &Url) -> ProxyResult<Transformed> {
        let upstream = self.fetcher.fetch(target).await?;

        let friendly = upstream
            .url
            .host_str()
            .is_some_and(|host| self.allow_list.is_friendly(host));
        let route = dispatch::classify(upstream.content_type.as_deref(), friendly, &self.config)?;
        let ctx = RequestContext::new(upstream.url, friendly);

        let (content_type, body) = match route {
            Route::Html => {
                let text = String::from_utf8_lossy(&upstream.body);
                let html = html::transform(&text, &ctx, &self.config, self.fetcher.as_ref()).await;
                (HTML_CONTENT_TYPE.to_string(), html.into_bytes())
            }
            Route::Css => {
                let text = String::from_utf8_lossy(&upstream.body);
                (CSS_CONTENT_TYPE.to_string(), css::transform(&text)?.into_bytes())
            }
            Route::Image => {
                let (max_width, quality) = (self.config.max_src_width, self.config.image_quality);
                let bytes = upstream.body;
                let jpeg = tokio::task::spawn_blocking(move || {
                    transcode::transcode(&bytes, max_width, quality)
                })
                .await??;
                (transcode::OUTPUT_CONTENT_TYPE.to_string(), jpeg)
            }
            Route::Passthrough => (upstream.content_type.unwrap_or_default(), upstream.body),
        };

        tracing::info!(
            pipeline = %route,
            url = %ctx.target,
            friendly,
            status = %upstream.status,
            bytes = body.len(),
            "Response transformed"
        );

        Ok(Transformed {
            route,
            status: upstream.status,
            content_type,
            body,
        })
    }
}
