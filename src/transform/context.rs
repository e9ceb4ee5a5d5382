//! Per-request state shared by the pipelines.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::OnceCell;
use url::Url;

use crate::transform::dimensions::{Dimensions, ResolveError};
use crate::transform::links;

/// One resolution slot per image URL; later callers await the first.
pub(crate) type ResolutionSlot = Arc<OnceCell<Result<Dimensions, ResolveError>>>;

/// Image dimensions memoized for the lifetime of one request.
#[derive(Debug, Default)]
pub struct DimensionCache {
    slots: DashMap<Url, ResolutionSlot>,
}

impl DimensionCache {
    /// Slot for `url`, created empty on first use.
    pub(crate) fn slot(&self, url: &Url) -> ResolutionSlot {
        // The map guard is released before anyone awaits the slot.
        Arc::clone(self.slots.entry(url.clone()).or_default().value())
    }
}

/// Everything the pipelines know about the request being served.
#[derive(Debug)]
pub struct RequestContext {
    /// Final upstream URL, after redirects.
    pub target: Url,
    /// Plain-scheme origin of `target`, used for root-relative links.
    pub origin: String,
    /// Target host is on the allow-list.
    pub friendly: bool,
    pub dimensions: DimensionCache,
}

impl RequestContext {
    pub fn new(target: Url, friendly: bool) -> Self {
        let origin = links::plain_origin(&target);
        Self {
            target,
            origin,
            friendly,
            dimensions: DimensionCache::default(),
        }
    }

    /// Resolve a possibly relative reference against the target URL.
    pub fn resolve(&self, reference: &str) -> Option<Url> {
        self.target.join(reference.trim()).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_relative_reference() {
        let ctx = RequestContext::new(Url::parse("https://example.com/blog/post.html").unwrap(), false);
        assert_eq!(ctx.origin, "http://example.com");
        assert_eq!(
            ctx.resolve("img/a.jpg").unwrap().as_str(),
            "https://example.com/blog/img/a.jpg"
        );
        assert_eq!(
            ctx.resolve(" /logo.png ").unwrap().as_str(),
            "https://example.com/logo.png"
        );
    }

    #[tokio::test]
    async fn test_slot_is_shared_per_url() {
        let cache = DimensionCache::default();
        let url = Url::parse("http://example.com/a.png").unwrap();

        let first = cache.slot(&url);
        let second = cache.slot(&url);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.slots.len(), 1);

        first
            .get_or_init(|| async {
                Ok(Dimensions {
                    width: 10,
                    height: 5,
                })
            })
            .await;
        let resolved = cache.slot(&url);
        assert_eq!(
            resolved.get().cloned().map(Result::unwrap),
            Some(Dimensions {
                width: 10,
                height: 5
            })
        );
    }
}
