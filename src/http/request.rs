//! Request handling.
//!
//! # Responsibilities
//! - Generate a unique request ID (UUID v4)
//! - Work out which upstream URL a proxy request targets
//!
//! # Design Decisions
//! - Request ID added as early as possible for tracing
//! - Absolute-form targets (what browsers send to a proxy) and the
//!   `/http://host/path` path form are both accepted

use axum::http::{HeaderName, HeaderValue, Request, Uri};
use tower_http::request_id::{MakeRequestId, RequestId};
use url::Url;
use uuid::Uuid;

use crate::error::{ProxyError, ProxyResult};

pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Request ID generator for `SetRequestIdLayer`.
#[derive(Debug, Clone, Copy, Default)]
pub struct MakeRequestUuidV4;

impl MakeRequestId for MakeRequestUuidV4 {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        HeaderValue::from_str(&Uuid::new_v4().to_string())
            .ok()
            .map(RequestId::new)
    }
}

/// Resolve the upstream URL named by an inbound request target.
pub fn resolve_target(uri: &Uri) -> ProxyResult<Url> {
    let raw = if uri.scheme().is_some() {
        uri.to_string()
    } else {
        let path = uri.path_and_query().map(|pq| pq.as_str()).unwrap_or("/");
        path.trim_start_matches('/').to_string()
    };

    if raw.is_empty() {
        return Err(ProxyError::InvalidTarget("no target URL in request".into()));
    }

    let url = Url::parse(&raw).map_err(|e| ProxyError::InvalidTarget(format!("{raw}: {e}")))?;
    match url.scheme() {
        "http" | "https" if url.host_str().is_some() => Ok(url),
        _ => Err(ProxyError::InvalidTarget(raw)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolve(s: &str) -> ProxyResult<Url> {
        resolve_target(&s.parse::<Uri>().unwrap())
    }

    #[test]
    fn test_absolute_form() {
        let url = resolve("http://example.com/page?q=1").unwrap();
        assert_eq!(url.as_str(), "http://example.com/page?q=1");
    }

    #[test]
    fn test_path_form() {
        let url = resolve("/http://example.com/a/b?x=y").unwrap();
        assert_eq!(url.as_str(), "http://example.com/a/b?x=y");

        let url = resolve("/https://example.com/").unwrap();
        assert_eq!(url.scheme(), "https");
    }

    #[test]
    fn test_rejects_other_targets() {
        assert!(matches!(resolve("/"), Err(ProxyError::InvalidTarget(_))));
        assert!(matches!(resolve("/favicon.ico"), Err(ProxyError::InvalidTarget(_))));
        assert!(matches!(
            resolve("/ftp://example.com/file"),
            Err(ProxyError::InvalidTarget(_))
        ));
    }

    #[test]
    fn test_request_ids_are_unique() {
        let request = Request::new(());
        let mut make = MakeRequestUuidV4;
        let a = make.make_request_id(&request).unwrap();
        let b = make.make_request_id(&request).unwrap();
        assert_ne!(a.header_value(), b.header_value());
        assert_eq!(a.header_value().len(), 36);
    }
}
