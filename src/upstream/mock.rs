//! In-memory upstream used by unit tests.

use std::collections::HashMap;
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use axum::http::StatusCode;
use futures_util::future::BoxFuture;
use url::Url;

use crate::upstream::{Fetch, FetchError, UpstreamResponse};

/// Serves canned responses by URL and counts every fetch.
#[derive(Default)]
pub struct MockFetcher {
    responses: HashMap<String, (StatusCode, Option<String>, Vec<u8>)>,
    calls: Mutex<HashMap<String, usize>>,
    total: AtomicUsize,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, url: &str, content_type: Option<&str>, body: impl Into<Vec<u8>>) -> Self {
        self.responses.insert(
            url.to_string(),
            (StatusCode::OK, content_type.map(str::to_string), body.into()),
        );
        self
    }

    pub fn with_png(self, url: &str, width: u32, height: u32) -> Self {
        self.with(url, Some("image/png"), png_bytes(width, height))
    }

    /// Number of fetches issued for `url`.
    pub fn calls(&self, url: &str) -> usize {
        self.calls.lock().unwrap().get(url).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.total.load(Ordering::SeqCst)
    }
}

impl Fetch for MockFetcher {
    fn fetch<'a>(&'a self, url: &'a Url) -> BoxFuture<'a, Result<UpstreamResponse, FetchError>> {
        Box::pin(async move {
            self.total.fetch_add(1, Ordering::SeqCst);
            *self
                .calls
                .lock()
                .unwrap()
                .entry(url.as_str().to_string())
                .or_default() += 1;

            // yield so concurrent resolutions really interleave
            tokio::task::yield_now().await;

            match self.responses.get(url.as_str()) {
                Some((status, content_type, body)) => Ok(UpstreamResponse {
                    url: url.clone(),
                    status: *status,
                    content_type: content_type.clone(),
                    body: body.clone(),
                }),
                None => Err(FetchError::Connect(format!("no route to {}", url))),
            }
        })
    }
}

/// Encode a solid PNG of the given size.
pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = image::RgbImage::from_pixel(width, height, image::Rgb([200, 40, 40]));
    let mut buf = Vec::new();
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();
    buf
}
