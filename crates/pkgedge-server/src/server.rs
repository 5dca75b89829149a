//! HTTP server.
//!
//! A hyper HTTP/1.1 accept loop in front of an [`App`]:
//!
//! - one task per connection, on whatever runtime drives the server
//!   (the `pkgedge` binary uses a current-thread runtime)
//! - request bodies are collected before routing, bounded in time and size;
//!   a body that cannot be read is still answered through the admission
//!   chain with `400`, `408` or `413`
//! - on shutdown the listener closes, open connections finish their
//!   in-flight request and are given `shutdown_timeout` to drain
//!
//! A client that disconnects mid-request drops the request future, so no
//! stage keeps running or writes for a closed connection.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use http::StatusCode;
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use pkgedge_config::ServerConfig;
use pkgedge_core::{Request, Response};
use tokio::net::TcpListener;

use crate::app::{App, UnreadableBody};
use crate::error::ServerError;
use crate::shutdown::{ConnectionTracker, ShutdownSignal};

/// The pkgedge HTTP server.
#[derive(Debug)]
pub struct Server {
    addr: String,
    app: Arc<App>,
    shutdown_timeout: Duration,
    body_timeout: Duration,
    max_body_bytes: usize,
}

impl Server {
    /// Creates a server for `app` using the `server` settings.
    pub fn new(app: App, config: &ServerConfig) -> Self {
        Self {
            addr: config.http_addr.clone(),
            app: Arc::new(app),
            shutdown_timeout: Duration::from_secs(config.shutdown_timeout_secs),
            body_timeout: Duration::from_millis(config.body_timeout_ms),
            max_body_bytes: usize::try_from(config.max_body_bytes).unwrap_or(usize::MAX),
        }
    }

    /// The configured listen address.
    pub fn addr(&self) -> &str {
        &self.addr
    }

    /// Binds the configured address and serves until SIGINT or SIGTERM.
    ///
    /// # Errors
    ///
    /// Returns `ServerError::Bind` if the address is invalid or in use.
    pub async fn run(self) -> Result<(), ServerError> {
        let shutdown = ShutdownSignal::with_os_signals();
        self.run_with_shutdown(shutdown).await
    }

    /// Binds the configured address and serves until `shutdown` triggers.
    ///
    /// # Errors
    ///
    /// Returns `ServerError::Bind` if the address is invalid or in use.
    pub async fn run_with_shutdown(self, shutdown: ShutdownSignal) -> Result<(), ServerError> {
        let addr: SocketAddr = self
            .addr
            .parse()
            .map_err(|e| ServerError::bind(format!("Invalid address '{}': {e}", self.addr)))?;

        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::bind(format!("Failed to bind to {addr}: {e}")))?;

        self.serve(listener, shutdown).await
    }

    /// Serves connections from an already bound listener.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the listener address cannot be read.
    pub async fn serve(
        self,
        listener: TcpListener,
        shutdown: ShutdownSignal,
    ) -> Result<(), ServerError> {
        tracing::info!(addr = %listener.local_addr()?, "pkgedge listening");

        let server = Arc::new(self);
        let tracker = ConnectionTracker::new();

        loop {
            tokio::select! {
                result = listener.accept() => {
                    match result {
                        Ok((stream, remote_addr)) => {
                            let server = Arc::clone(&server);
                            let token = tracker.acquire();
                            let shutdown = shutdown.clone();

                            tokio::spawn(async move {
                                if let Err(e) = server.handle_connection(stream, shutdown).await {
                                    tracing::debug!(%remote_addr, error = %e, "connection error");
                                }
                                drop(token);
                            });
                        }
                        Err(e) => {
                            tracing::error!(error = %e, "Failed to accept connection");
                        }
                    }
                }

                () = shutdown.recv() => {
                    tracing::info!("Shutdown signal received, stopping server");
                    break;
                }
            }
        }

        drop(listener);

        tracing::info!(
            timeout = ?server.shutdown_timeout,
            connections = tracker.active_connections(),
            "Waiting for connections to close"
        );

        tokio::select! {
            () = tracker.wait_for_drain() => {
                tracing::info!("All connections closed");
            }
            () = tokio::time::sleep(server.shutdown_timeout) => {
                tracing::warn!(
                    connections = tracker.active_connections(),
                    "Shutdown timeout reached with connections still open"
                );
            }
        }

        tracing::info!("Server stopped");
        Ok(())
    }

    async fn handle_connection(
        self: &Arc<Self>,
        stream: tokio::net::TcpStream,
        shutdown: ShutdownSignal,
    ) -> Result<(), hyper::Error> {
        let io = TokioIo::new(stream);
        let server = Arc::clone(self);

        let service = service_fn(move |request: http::Request<Incoming>| {
            let server = Arc::clone(&server);
            async move { Ok::<_, Infallible>(server.handle_request(request).await) }
        });

        let conn = http1::Builder::new().serve_connection(io, service);
        tokio::pin!(conn);

        tokio::select! {
            result = conn.as_mut() => result,
            () = shutdown.recv() => {
                conn.as_mut().graceful_shutdown();
                conn.await
            }
        }
    }

    async fn handle_request(&self, request: http::Request<Incoming>) -> Response {
        let (parts, body) = request.into_parts();
        let body = Limited::new(body, self.max_body_bytes);

        let (body, unreadable) = match tokio::time::timeout(self.body_timeout, body.collect()).await
        {
            Ok(Ok(collected)) => (collected.to_bytes(), None),
            Ok(Err(e)) if e.is::<LengthLimitError>() => {
                tracing::debug!(limit = self.max_body_bytes, "Request body too large");
                (Bytes::new(), Some(StatusCode::PAYLOAD_TOO_LARGE))
            }
            Ok(Err(e)) => {
                tracing::debug!(error = %e, "Failed to read request body");
                (Bytes::new(), Some(StatusCode::BAD_REQUEST))
            }
            Err(_) => {
                tracing::debug!("Request body collection timed out");
                (Bytes::new(), Some(StatusCode::REQUEST_TIMEOUT))
            }
        };

        let mut request: Request = http::Request::from_parts(parts, Full::new(body));
        if let Some(status) = unreadable {
            request.extensions_mut().insert(UnreadableBody(status));
        }
        self.app.handle(request).await
    }
}
