//! Command-line interface.
//!
//! Flags override whatever the config file (or the defaults) set.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;

use clap::Parser;

use crate::config::ProxyConfig;

#[derive(Debug, Parser)]
#[command(name = "lowband-proxy")]
#[command(about = "HTTP proxy that slims pages down for old and slow clients", long_about = None)]
pub struct Cli {
    /// Port to listen on
    pub port: Option<u16>,

    /// Keep stylesheets and style attributes (minified)
    #[arg(long)]
    pub css: bool,

    /// Do not resize or re-encode images
    #[arg(long)]
    pub fullimages: bool,

    /// Keep scripts
    #[arg(long)]
    pub js: bool,

    /// Address to bind to
    #[arg(long, value_name = "ADDR")]
    pub bind: Option<IpAddr>,

    /// Newline-separated list of friendly host suffixes
    #[arg(long, value_name = "PATH")]
    pub allow_list: Option<PathBuf>,

    /// TOML config file
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, value_name = "LEVEL")]
    pub log_level: Option<String>,
}

impl Cli {
    /// Apply command-line overrides on top of `config`.
    pub fn apply(&self, config: &mut ProxyConfig) {
        if self.port.is_some() || self.bind.is_some() {
            let current = config
                .listener
                .bind_address
                .parse::<SocketAddr>()
                .unwrap_or_else(|_| SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 8080));
            let addr = SocketAddr::new(
                self.bind.unwrap_or(current.ip()),
                self.port.unwrap_or(current.port()),
            );
            config.listener.bind_address = addr.to_string();
        }
        if self.css {
            config.transform.strip_css = false;
        }
        if self.js {
            config.transform.strip_js = false;
        }
        if self.fullimages {
            config.transform.minify_images = false;
        }
        if let Some(path) = &self.allow_list {
            config.allow_list.path = Some(path.clone());
        }
        if let Some(level) = &self.log_level {
            config.observability.log_level = level.clone();
        }
    }
}
