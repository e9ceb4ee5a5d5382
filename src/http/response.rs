//! Response construction.
//!
//! Pipeline output keeps the upstream status with the pipeline's own
//! content type. Errors become a small HTML page naming the failure.

use axum::http::{header, HeaderValue};
use axum::response::{IntoResponse, Response};

use crate::error::ProxyError;
use crate::transform::Transformed;

impl IntoResponse for Transformed {
    fn into_response(self) -> Response {
        let mut response = (self.status, self.body).into_response();
        if let Ok(value) = HeaderValue::from_str(&self.content_type) {
            response.headers_mut().insert(header::CONTENT_TYPE, value);
        }
        response
    }
}

/// Minimal HTML body for an error response.
pub fn error_page(error: &ProxyError) -> String {
    let status = error.status();
    let message = html_escape::encode_text(&error.to_string()).into_owned();
    format!(
        "<html><head><title>{status}</title></head><body><h1>{status}</h1><p>{message}</p></body></html>"
    )
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        (
            self.status(),
            [(header::CONTENT_TYPE, "text/html; charset=utf-8")],
            error_page(&self),
        )
            .into_response()
    }
}
