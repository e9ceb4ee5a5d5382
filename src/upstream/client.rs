//! `reqwest`-backed upstream client.

use std::time::Duration;

use futures_util::future::BoxFuture;
use reqwest::header::CONTENT_TYPE;
use url::Url;

use crate::config::ProxyConfig;
use crate::upstream::{Fetch, FetchError, UpstreamResponse};

const USER_AGENT: &str = concat!("lowband-proxy/", env!("CARGO_PKG_VERSION"));

/// HTTP client shared by every request.
///
/// `reqwest::Client` is internally reference counted, so cloning the fetcher
/// is cheap and all clones share one connector.
#[derive(Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    max_body_size: usize,
}

impl HttpFetcher {
    /// Build a client using the timeout and body limits from the config.
    pub fn new(config: &ProxyConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(Duration::from_secs(config.timeouts.connect_secs))
            .timeout(Duration::from_secs(config.timeouts.upstream_secs))
            // we are the proxy; never chain through HTTP_PROXY from the environment
            .no_proxy()
            .build()?;

        Ok(Self {
            client,
            max_body_size: config.limits.max_body_size,
        })
    }

    async fn get(&self, url: &Url) -> Result<UpstreamResponse, FetchError> {
        let mut response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| FetchError::Connect(e.to_string()))?;

        let status = response.status();
        let final_url = response.url().clone();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        if let Some(len) = response.content_length() {
            if len > self.max_body_size as u64 {
                return Err(FetchError::TooLarge {
                    limit: self.max_body_size,
                });
            }
        }

        // Stream so an oversized body is rejected without buffering all of it.
        let mut body = Vec::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| FetchError::Body(e.to_string()))?
        {
            if body.len() + chunk.len() > self.max_body_size {
                return Err(FetchError::TooLarge {
                    limit: self.max_body_size,
                });
            }
            body.extend_from_slice(&chunk);
        }

        tracing::debug!(
            url = %final_url,
            status = %status,
            bytes = body.len(),
            "Upstream response received"
        );

        Ok(UpstreamResponse {
            url: final_url,
            status,
            content_type,
            body,
        })
    }
}

impl Fetch for HttpFetcher {
    fn fetch<'a>(&'a self, url: &'a Url) -> BoxFuture<'a, Result<UpstreamResponse, FetchError>> {
        Box::pin(self.get(url))
    }
}
