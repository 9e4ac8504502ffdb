//! HTTP server.
//!
//! One hyper HTTP/1 connection task per accepted socket. Every RPC is
//! `POST /{service}/{operation}` with a JSON body; `GET /health`,
//! `GET /ready` and `GET /metrics` are answered before routing.
//!
//! On shutdown the server stops accepting, reports not-ready, lets open
//! connections finish their in-flight requests for up to
//! `shutdown_timeout_secs` and finally closes the admission pool.
//!
//! ```rust,ignore
//! use vellum_server::{bootstrap, ShutdownSignal};
//!
//! let config = vellum_config::ConfigLoader::new().load()?;
//! let server = bootstrap::build(&config)?;
//! server.run_with_shutdown(ShutdownSignal::with_os_signals()).await?;
//! ```

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use http::{Method, Request, StatusCode};
use http_body_util::BodyExt;
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::{TokioIo, TokioTimer};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, error, info, warn, Instrument};
use uuid::Uuid;
use vellum_config::ServerConfig;
use vellum_core::{CallerId, RequestContext, RequestId, VellumError};
use vellum_pipeline::WorkerPool;

use crate::dispatch::{Dispatcher, Reply};
use crate::error::{ServerError, ServerResult};
use crate::health::{HealthCheck, ReadinessStatus};
use crate::response::{
    error_response, error_with_status, json_response, ndjson_response, text_response,
    HttpResponse, CALLER_HEADER, REQUEST_ID_HEADER,
};
use crate::routes::Operation;
use crate::shutdown::{ConnectionTracker, ShutdownSignal};

/// The Vellum HTTP server.
#[derive(Debug)]
pub struct Server {
    config: ServerConfig,
    dispatcher: Dispatcher,
    health: HealthCheck,
}

impl Server {
    /// Creates a server.
    pub fn new(config: ServerConfig, dispatcher: Dispatcher, service_name: &str) -> Self {
        Self {
            config,
            dispatcher,
            health: HealthCheck::new(service_name),
        }
    }

    /// Health state.
    pub fn health(&self) -> &HealthCheck {
        &self.health
    }

    /// Transport settings.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    fn pool(&self) -> &WorkerPool {
        self.dispatcher.services().pool()
    }

    /// Runs until SIGTERM or SIGINT.
    pub async fn run(self) -> ServerResult<()> {
        self.run_with_shutdown(ShutdownSignal::with_os_signals()).await
    }

    /// Binds `http_addr` and runs until `shutdown` triggers.
    pub async fn run_with_shutdown(self, shutdown: ShutdownSignal) -> ServerResult<()> {
        let addr: SocketAddr = self
            .config
            .http_addr
            .parse()
            .map_err(|e| ServerError::bind(&self.config.http_addr, e))?;
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::bind(addr.to_string(), e))?;
        self.serve(listener, shutdown).await
    }

    /// Serves on an already bound listener until `shutdown` triggers.
    pub async fn serve(self, listener: TcpListener, shutdown: ShutdownSignal) -> ServerResult<()> {
        let local = listener.local_addr()?;
        info!(addr = %local, "server listening");

        let server = Arc::new(self);
        let tracker = ConnectionTracker::new();
        let max_connections = server.config.max_connections as usize;

        loop {
            tokio::select! {
                result = listener.accept() => {
                    match result {
                        Ok((stream, remote)) => {
                            if tracker.active_connections() >= max_connections {
                                warn!(%remote, max_connections, "connection limit reached, dropping connection");
                                drop(stream);
                                continue;
                            }
                            let server = Arc::clone(&server);
                            let token = tracker.acquire();
                            let shutdown = shutdown.clone();
                            tokio::spawn(async move {
                                if let Err(e) = server.handle_connection(stream, remote, shutdown).await {
                                    debug!(%remote, error = %e, "connection closed with error");
                                }
                                drop(token);
                            });
                        }
                        Err(e) => error!(error = %e, "failed to accept connection"),
                    }
                }
                () = shutdown.recv() => {
                    info!("shutdown signal received, no longer accepting");
                    break;
                }
            }
        }

        server.health.set_ready(false);

        let timeout = Duration::from_secs(server.config.shutdown_timeout_secs);
        info!(
            timeout_secs = timeout.as_secs(),
            connections = tracker.active_connections(),
            "draining connections"
        );
        tokio::select! {
            () = tracker.wait_for_shutdown() => info!("all connections closed"),
            () = tokio::time::sleep(timeout) => warn!(
                connections = tracker.active_connections(),
                "shutdown timeout reached, abandoning connections"
            ),
        }

        server.pool().close();
        info!("server stopped");
        Ok(())
    }

    async fn handle_connection(
        self: &Arc<Self>,
        stream: TcpStream,
        remote: SocketAddr,
        shutdown: ShutdownSignal,
    ) -> Result<(), hyper::Error> {
        let io = TokioIo::new(stream);
        let server = Arc::clone(self);
        let service = service_fn(move |req: Request<Incoming>| {
            let server = Arc::clone(&server);
            async move { server.handle_request(req).await }
        });

        let mut builder = http1::Builder::new();
        match self.config.keep_alive_secs {
            Some(secs) => {
                builder
                    .keep_alive(true)
                    .timer(TokioTimer::new())
                    .header_read_timeout(Duration::from_secs(secs));
            }
            None => {
                builder.keep_alive(false);
            }
        }
        let conn = builder.serve_connection(io, service);
        tokio::pin!(conn);

        tokio::select! {
            result = conn.as_mut() => result,
            () = shutdown.recv() => {
                debug!(%remote, "finishing connection for shutdown");
                conn.as_mut().graceful_shutdown();
                conn.await
            }
        }
    }

    async fn handle_request(
        self: Arc<Self>,
        req: Request<Incoming>,
    ) -> Result<HttpResponse, Infallible> {
        let method = req.method().clone();
        let path = req.uri().path().to_string();

        if method == Method::GET {
            match path.as_str() {
                "/health" => return Ok(json_response(StatusCode::OK, &self.health.status(), None)),
                "/ready" => return Ok(self.handle_ready()),
                "/metrics" => return Ok(handle_metrics()),
                _ => {}
            }
        }

        let request_id = request_id(&req);
        let Some((service, operation, op)) = Operation::from_path(&path) else {
            debug!(%method, %path, "no route");
            let err = VellumError::not_found(format!("no operation at {path}"));
            return Ok(error_response(&err, Some(&request_id)));
        };
        if method != Method::POST {
            let err = VellumError::invalid_request(format!("{path} expects POST"));
            return Ok(error_with_status(
                StatusCode::METHOD_NOT_ALLOWED,
                &err,
                Some(&request_id),
            ));
        }
        if !self.health.is_ready() {
            let err = VellumError::dependency_unavailable("server", "shutting down");
            return Ok(error_response(&err, Some(&request_id)));
        }

        let ctx = RequestContext::new(service, operation)
            .with_caller(caller(&req))
            .with_request_id(request_id);
        let span = tracing::info_span!(
            "rpc",
            service = ctx.service(),
            operation = ctx.operation(),
            caller = %ctx.caller(),
            request_id = %request_id,
        );

        let response = async {
            let body = match req.into_body().collect().await {
                Ok(collected) => collected.to_bytes(),
                Err(e) => {
                    let err = VellumError::invalid_request(format!("failed to read body: {e}"));
                    return error_response(&err, Some(&request_id));
                }
            };
            match self.dispatcher.dispatch(op, &ctx, &body).await {
                Ok(Reply::Unary(value)) => json_response(StatusCode::OK, &value, Some(&request_id)),
                Ok(Reply::Stream(messages)) => ndjson_response(messages, request_id).await,
                Err(err) => {
                    debug!(error = %err, "call failed");
                    error_response(&err, Some(&request_id))
                }
            }
        }
        .instrument(span)
        .await;
        Ok(response)
    }

    fn handle_ready(&self) -> HttpResponse {
        let pool = self.pool();
        let status = ReadinessStatus {
            ready: self.health.is_ready(),
            in_flight: pool.in_flight(),
            max_in_flight: pool.max_in_flight(),
        };
        let code = if status.ready {
            StatusCode::OK
        } else {
            StatusCode::SERVICE_UNAVAILABLE
        };
        json_response(code, &status, None)
    }
}

fn handle_metrics() -> HttpResponse {
    match vellum_telemetry::render_metrics() {
        Some(body) => text_response(StatusCode::OK, body),
        None => text_response(StatusCode::NOT_FOUND, "metrics disabled\n".to_string()),
    }
}

fn caller<B>(req: &Request<B>) -> CallerId {
    req.headers()
        .get(CALLER_HEADER)
        .and_then(|value| value.to_str().ok())
        .map_or_else(CallerId::anonymous, |value| CallerId::new(value.trim()))
}

fn request_id<B>(req: &Request<B>) -> RequestId {
    req.headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| Uuid::parse_str(value).ok())
        .map_or_else(RequestId::new, RequestId::from_uuid)
}
