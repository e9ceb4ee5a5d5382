//! Natural image dimensions, resolved at most once per URL per request.

use std::io::Cursor;

use thiserror::Error;
use url::Url;

use crate::observability::metrics;
use crate::transform::context::DimensionCache;
use crate::upstream::{Fetch, FetchError};

/// Width and height in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

/// Why an image's dimensions are unknown.
#[derive(Debug, Clone, Error)]
pub enum ResolveError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("Cannot read image header: {0}")]
    Decode(String),

    #[error("Unsupported image URL scheme '{0}'")]
    UnsupportedScheme(String),
}

/// Natural dimensions of the image at `url`.
///
/// Concurrent and repeated calls for the same URL within one cache share a
/// single fetch. Failures are memoized as well.
pub async fn resolve(
    fetcher: &dyn Fetch,
    cache: &DimensionCache,
    url: &Url,
) -> Result<Dimensions, ResolveError> {
    let slot = cache.slot(url);
    slot.get_or_init(|| measure(fetcher, url)).await.clone()
}

async fn measure(fetcher: &dyn Fetch, url: &Url) -> Result<Dimensions, ResolveError> {
    if !matches!(url.scheme(), "http" | "https") {
        metrics::record_image_resolution("unsupported");
        return Err(ResolveError::UnsupportedScheme(url.scheme().to_string()));
    }

    let result = fetch_dimensions(fetcher, url).await;
    metrics::record_image_resolution(if result.is_ok() { "ok" } else { "error" });
    result
}

async fn fetch_dimensions(fetcher: &dyn Fetch, url: &Url) -> Result<Dimensions, ResolveError> {
    let upstream = fetcher.fetch(url).await?;
    let (width, height) = read_dimensions(&upstream.body)?;
    tracing::debug!(url = %url, width, height, "Image dimensions resolved");
    Ok(Dimensions { width, height })
}

// Only the header is parsed; the pixels are never decoded.
fn read_dimensions(bytes: &[u8]) -> Result<(u32, u32), ResolveError> {
    image::ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| ResolveError::Decode(e.to_string()))?
        .into_dimensions()
        .map_err(|e| ResolveError::Decode(e.to_string()))
}
