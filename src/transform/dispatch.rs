//! Content-type dispatch.

use std::fmt;

use crate::config::TransformConfig;
use crate::error::{ProxyError, ProxyResult};

/// Which pipeline handles a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Html,
    Css,
    Image,
    Passthrough,
}

impl Route {
    pub fn as_str(&self) -> &'static str {
        match self {
            Route::Html => "html",
            Route::Css => "css",
            Route::Image => "image",
            Route::Passthrough => "passthrough",
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pick the pipeline for a response. First match wins.
///
/// Friendly hosts only ever reach the HTML pipeline (which then runs in
/// friendly mode); everything else they serve is passed through.
pub fn classify(
    content_type: Option<&str>,
    friendly: bool,
    config: &TransformConfig,
) -> ProxyResult<Route> {
    let content_type = content_type
        .map(str::trim)
        .filter(|ct| !ct.is_empty())
        .ok_or(ProxyError::MissingContentType)?
        .to_ascii_lowercase();

    let route = if content_type.starts_with("text/html") {
        Route::Html
    } else if content_type.starts_with("text/css") && !friendly {
        Route::Css
    } else if content_type.starts_with("image/")
        && !content_type.contains("xml")
        && config.minify_images
        && !friendly
    {
        Route::Image
    } else {
        Route::Passthrough
    };
    Ok(route)
}
