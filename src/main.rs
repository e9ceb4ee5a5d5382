//! Low-bandwidth forward HTTP proxy.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request        ┌──────────────────────────────────────────────┐
//!     ──────────────────────┼─▶ http::server ──▶ http::request (target)     │
//!                           │                          │                    │
//!                           │                          ▼                    │
//!                           │                 transform::Pipeline           │
//!                           │                   │            ▲              │
//!                           │                   ▼            │              │
//!                           │            upstream::Fetch ────┘ ◀────────────┼──── Origin
//!                           │                   │                           │     Server
//!                           │                   ▼                           │
//!                           │   dispatch ─▶ html │ css │ image │ passthrough │
//!     Client Response       │                   │                           │
//!     ◀─────────────────────┼── http::response ◀┘                           │
//!                           │                                               │
//!                           │  config · observability · lifecycle           │
//!                           └──────────────────────────────────────────────┘
//! ```

use std::process::ExitCode;

use clap::Parser;

use lowband_proxy::cli::Cli;
use lowband_proxy::config::loader;
use lowband_proxy::config::ProxyConfig;
use lowband_proxy::lifecycle::{self, signals, Shutdown};
use lowband_proxy::observability::{logging, metrics};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => match loader::load_config(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("{e}");
                return ExitCode::FAILURE;
            }
        },
        None => ProxyConfig::default(),
    };
    cli.apply(&mut config);
    if let Err(e) = loader::validate(&config) {
        eprintln!("{e}");
        return ExitCode::FAILURE;
    }

    logging::init(&config.observability);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "lowband-proxy starting");
    tracing::info!(
        bind_address = %config.listener.bind_address,
        strip_css = config.transform.strip_css,
        strip_js = config.transform.strip_js,
        minify_images = config.transform.minify_images,
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let prepared = match lifecycle::prepare(&config).await {
        Ok(prepared) => prepared,
        Err(e) => {
            tracing::error!(error = %e, "Startup failed");
            return ExitCode::FAILURE;
        }
    };
    if let Ok(addr) = prepared.local_addr() {
        tracing::info!(address = %addr, "Listening for connections");
    }

    let shutdown = Shutdown::new();
    let stopped = shutdown.wait();
    tokio::spawn(async move {
        signals::terminate().await;
        shutdown.trigger();
    });

    if let Err(e) = prepared.server.run(prepared.listener, stopped).await {
        tracing::error!(error = %e, "Server error");
        return ExitCode::FAILURE;
    }

    tracing::info!("Shutdown complete");
    ExitCode::SUCCESS
}
