//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the proxy handler
//! - Wire up middleware (request ID, tracing, timeout)
//! - Bind server to listener and drain on shutdown
//! - Hand each request to the transform pipeline
//! - Observability (metrics, correlation IDs)

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::State,
    http::{Request, Uri},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use tokio::net::TcpListener;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::ProxyConfig;
use crate::http::request::{resolve_target, MakeRequestUuidV4, X_REQUEST_ID};
use crate::observability::metrics;
use crate::transform::Pipeline;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<Pipeline>,
}

/// HTTP front end of the proxy.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    /// Create a new HTTP server serving `pipeline`.
    pub fn new(config: &ProxyConfig, pipeline: Pipeline) -> Self {
        let state = AppState {
            pipeline: Arc::new(pipeline),
        };
        Self {
            router: Self::build_router(config, state),
        }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &ProxyConfig, state: AppState) -> Router {
        Router::new()
            .route("/", get(proxy_handler))
            .route("/{*path}", get(proxy_handler))
            .with_state(state)
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(PropagateRequestIdLayer::new(X_REQUEST_ID))
            .layer(TraceLayer::new_for_http().make_span_with(request_span))
            .layer(SetRequestIdLayer::new(X_REQUEST_ID, MakeRequestUuidV4))
    }

    /// Serve on `listener` until `shutdown` completes, then drain.
    pub async fn run<F>(self, listener: TcpListener, shutdown: F) -> Result<(), std::io::Error>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown)
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Span for one inbound request, tagged with the ID set by the outer layer.
fn request_span(request: &Request<Body>) -> tracing::Span {
    let request_id = request
        .headers()
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown");
    tracing::info_span!(
        "request",
        request_id = %request_id,
        method = %request.method(),
        uri = %request.uri(),
    )
}

/// Main proxy handler.
/// Resolves the target, runs the pipeline and converts the outcome.
async fn proxy_handler(State(state): State<AppState>, uri: Uri) -> Response {
    let start_time = Instant::now();

    let target = match resolve_target(&uri) {
        Ok(target) => target,
        Err(e) => {
            tracing::warn!(uri = %uri, error = %e, "Rejected proxy request");
            metrics::record_request("none", e.status().as_u16(), start_time);
            return e.into_response();
        }
    };

    tracing::debug!(url = %target, "Proxying request");

    match state.pipeline.process(&target).await {
        Ok(transformed) => {
            metrics::record_request(
                transformed.route.as_str(),
                transformed.status.as_u16(),
                start_time,
            );
            transformed.into_response()
        }
        Err(e) => {
            tracing::error!(url = %target, error = %e, "Proxy request failed");
            metrics::record_request("error", e.status().as_u16(), start_time);
            e.into_response()
        }
    }
}
