//! Shared utilities for integration tests.

use std::io::Cursor;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use image::{ImageBuffer, ImageFormat, Rgb};
use lowband_proxy::config::ProxyConfig;
use lowband_proxy::lifecycle::{self, Shutdown};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// Canned upstream response.
pub struct Reply {
    pub status: u16,
    pub content_type: Option<&'static str>,
    pub body: Vec<u8>,
}

impl Reply {
    pub fn ok(content_type: &'static str, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status: 200,
            content_type: Some(content_type),
            body: body.into(),
        }
    }

    pub fn status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }
}

/// Start a programmable mock origin; `f` maps a request path to a reply.
pub async fn start_programmable_backend<F>(f: F) -> SocketAddr
where
    F: Fn(&str) -> Reply + Send + Sync + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let f = Arc::new(f);

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let f = f.clone();
                    tokio::spawn(async move {
                        let path = read_request_path(&mut socket).await;
                        let reply = f(&path);
                        let status_text = match reply.status {
                            200 => "200 OK",
                            404 => "404 Not Found",
                            500 => "500 Internal Server Error",
                            _ => "200 OK",
                        };

                        let mut head = format!(
                            "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n",
                            status_text,
                            reply.body.len()
                        );
                        if let Some(ct) = reply.content_type {
                            head.push_str(&format!("Content-Type: {ct}\r\n"));
                        }
                        head.push_str("\r\n");

                        let _ = socket.write_all(head.as_bytes()).await;
                        let _ = socket.write_all(&reply.body).await;
                        let _ = socket.shutdown().await;
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    addr
}

async fn read_request_path(socket: &mut tokio::net::TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
        match socket.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
        }
    }
    String::from_utf8_lossy(&buf)
        .lines()
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .unwrap_or("/")
        .to_string()
}

/// Start the full proxy on an ephemeral port.
pub async fn start_proxy(mut config: ProxyConfig) -> (SocketAddr, Shutdown) {
    config.listener.bind_address = "127.0.0.1:0".into();
    let prepared = lifecycle::prepare(&config).await.unwrap();
    let addr = prepared.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let stopped = shutdown.wait();
    tokio::spawn(async move {
        let _ = prepared.server.run(prepared.listener, stopped).await;
    });
    (addr, shutdown)
}

/// Client that talks to the proxy directly (path form).
pub fn direct_client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}

/// Client configured to use the proxy the way a browser would.
pub fn proxied_client(proxy: SocketAddr) -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .proxy(reqwest::Proxy::http(format!("http://{proxy}")).unwrap())
        .build()
        .unwrap()
}

/// Solid-color PNG of the given size.
pub fn png(width: u32, height: u32) -> Vec<u8> {
    let img = ImageBuffer::from_pixel(width, height, Rgb([200u8, 80, 40]));
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, ImageFormat::Png).unwrap();
    out.into_inner()
}
