//! # HTTP Server
//!
//! HTTP/1 transport built on Hyper and Tokio with graceful shutdown.
//! The server owns nothing but a listening socket and a shared
//! [`Engine`]; every request is converted to the core [`Request`]
//! wrapper, dispatched synchronously, and the resulting response is
//! converted back to hyper.
//!
//! Cancellation and timeouts live here, at the transport layer; the
//! routing core makes no assumptions about either.

use crate::engine::Engine;
use crate::error::{Error, Result};
use crate::request::Request;
use http_body_util::Full;
use hyper::body::Bytes;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::StatusCode;
use hyper_util::rt::TokioIo;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

/// HTTP server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind the server to
    pub address: SocketAddr,
    /// Enable keep-alive connections
    pub keep_alive: bool,
    /// Shutdown timeout for graceful shutdown
    pub shutdown_timeout: Duration,
    /// Max request body size in bytes
    pub max_body_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: ([127, 0, 0, 1], 8000).into(),
            keep_alive: true,
            shutdown_timeout: Duration::from_secs(30),
            max_body_size: 1024 * 1024,
        }
    }
}

/// HTTP/1 server driving an [`Engine`]
pub struct Server {
    config: ServerConfig,
    engine: Arc<Engine>,
}

impl Server {
    /// Create a server with default configuration
    #[must_use]
    pub fn new(engine: Arc<Engine>) -> Self {
        Self {
            config: ServerConfig::default(),
            engine,
        }
    }

    /// Bind the server to an address
    #[must_use]
    pub fn bind(mut self, address: SocketAddr) -> Self {
        self.config.address = address;
        self
    }

    /// Replace the whole configuration
    #[must_use]
    pub fn with_config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    /// Set max request body size
    pub fn set_max_body_size(&mut self, bytes: usize) {
        self.config.max_body_size = bytes;
    }

    /// Accept connections until a shutdown signal, then drain
    pub async fn serve(&self) -> Result<()> {
        let addr = self.config.address;

        let socket = tokio::net::TcpSocket::new_v4()?;
        socket.set_reuseaddr(true)?;
        #[cfg(not(windows))]
        {
            socket.set_reuseport(true)?;
        }
        socket.bind(addr).map_err(|source| Error::Bind {
            address: addr.to_string(),
            source,
        })?;

        let listener = socket.listen(1024)?;

        info!("server listening on http://{addr}");

        let active = Arc::new(AtomicUsize::new(0));
        let keep_alive = self.config.keep_alive;
        let max_body_size = self.config.max_body_size;

        loop {
            tokio::select! {
                accept_result = listener.accept() => {
                    let (stream, remote_addr) = accept_result?;
                    let io = TokioIo::new(stream);

                    let engine = self.engine.clone();
                    let active = active.clone();

                    tokio::task::spawn(async move {
                        active.fetch_add(1, Ordering::Relaxed);

                        if let Err(err) = http1::Builder::new()
                            .keep_alive(keep_alive)
                            .serve_connection(io, service_fn(move |req| {
                                let engine = engine.clone();
                                async move {
                                    handle_connection_request(req, &engine, remote_addr, max_body_size).await
                                }
                            }))
                            .await
                        {
                            error!("error serving connection: {err:?}");
                        }

                        active.fetch_sub(1, Ordering::Relaxed);
                    });
                }
                () = shutdown_signal() => {
                    info!("shutdown signal received, stopping server");
                    break;
                }
            }
        }

        // Drain in-flight connections up to the configured timeout
        let timeout = self.config.shutdown_timeout;
        let drain = async {
            loop {
                if active.load(Ordering::Relaxed) == 0 {
                    break;
                }
                tokio::time::sleep(Duration::from_millis(50)).await;
            }
        };
        let _ = tokio::time::timeout(timeout, drain).await;
        Ok(())
    }
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("failed to install CTRL+C signal handler");
}

async fn handle_connection_request(
    req: hyper::Request<hyper::body::Incoming>,
    engine: &Engine,
    remote_addr: SocketAddr,
    max_body_size: usize,
) -> std::result::Result<hyper::Response<Full<Bytes>>, hyper::Error> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let version = format!("{:?}", req.version());

    let request = match Request::from_hyper_with_limit(req, max_body_size).await {
        Ok(request) => request,
        Err(Error::PayloadTooLarge { .. }) => {
            return Ok(plain_status(
                StatusCode::PAYLOAD_TOO_LARGE,
                "Payload Too Large",
            ));
        }
        Err(err) => {
            error!("failed to parse request: {err}");
            return Ok(plain_status(StatusCode::BAD_REQUEST, "Bad Request"));
        }
    };

    let response = engine.handle_request(request);
    let status = response.status();
    info!("    {remote_addr} - \"{method} {path} {version}\" {status}");

    Ok(response.into_hyper())
}

fn plain_status(status: StatusCode, body: &'static str) -> hyper::Response<Full<Bytes>> {
    hyper::Response::builder()
        .status(status)
        .body(Full::new(Bytes::from(body)))
        .expect("static response")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_config_default() {
        let config = ServerConfig::default();
        assert_eq!(config.address.port(), 8000);
        assert!(config.keep_alive);
        assert_eq!(config.max_body_size, 1024 * 1024);
    }

    #[test]
    fn test_server_builder() {
        let engine = Arc::new(Engine::new());
        let server = Server::new(engine).bind(([0, 0, 0, 0], 9000).into());
        assert_eq!(server.config.address.port(), 9000);

        let mut server = server.with_config(ServerConfig::default());
        server.set_max_body_size(64);
        assert_eq!(server.config.max_body_size, 64);
    }

    #[test]
    fn test_plain_status() {
        let resp = plain_status(StatusCode::BAD_REQUEST, "Bad Request");
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }
}
