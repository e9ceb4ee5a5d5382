//! Startup orchestration.
//!
//! # Responsibilities
//! - Load the allow-list and build the upstream client
//! - Assemble the transform pipeline and HTTP server
//! - Bind the listener last, so traffic only arrives when ready
//!
//! Logging and the metrics recorder are process-global and are installed
//! by the binary before calling [`prepare`].

use std::net::SocketAddr;
use std::sync::Arc;

use thiserror::Error;
use tokio::net::TcpListener;

use crate::config::{AllowList, ProxyConfig};
use crate::http::HttpServer;
use crate::transform::Pipeline;
use crate::upstream::HttpFetcher;

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("Failed to build upstream client: {0}")]
    Client(#[from] reqwest::Error),

    #[error("Failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },
}

/// A server ready to run on its bound listener.
pub struct Prepared {
    pub server: HttpServer,
    pub listener: TcpListener,
}

impl Prepared {
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }
}

/// Build every subsystem from a validated config and bind the listener.
pub async fn prepare(config: &ProxyConfig) -> Result<Prepared, StartupError> {
    let allow_list = match &config.allow_list.path {
        Some(path) => AllowList::load(path),
        None => AllowList::default(),
    };
    tracing::info!(friendly_hosts = allow_list.len(), "Allow-list loaded");

    let fetcher = Arc::new(HttpFetcher::new(config)?);
    let pipeline = Pipeline::new(config.transform.clone(), allow_list, fetcher);
    let server = HttpServer::new(config, pipeline);

    let address = config.listener.bind_address.clone();
    let listener = TcpListener::bind(&address)
        .await
        .map_err(|source| StartupError::Bind { address, source })?;

    Ok(Prepared { server, listener })
}
