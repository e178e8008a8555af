//! HTTP server setup and the proxy handler.
//!
//! # Responsibilities
//! - Create the Axum Router that sends every path to the proxy handler
//! - Wire up middleware (request ID, tracing)
//! - Translate each inbound request into exactly one upstream request
//! - Relay the upstream response as a stream
//! - Drain in-flight requests on shutdown, bounded by the drain timeout

use std::future::IntoFuture;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{Method, Request},
    middleware,
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::config::{ProxyConfig, ResponseHeaderPolicy};
use crate::error::ProxyError;
use crate::http::request::{assign_request_id, RequestId, RequestIdExt};
use crate::http::response::RelayBody;
use crate::lifecycle::ShutdownListener;
use crate::observability::metrics;
use crate::rewrite::{
    outbound_request_headers, relayed_response_headers, TargetError, UpstreamTarget,
};
use crate::upstream::UpstreamPool;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub target: Arc<UpstreamTarget>,
    pub pool: UpstreamPool,
    pub allowed_methods: Arc<[Method]>,
    pub policy: ResponseHeaderPolicy,
    pub response_timeout: Duration,
    pub read_idle: Duration,
}

/// HTTP server for the proxy.
pub struct HttpServer {
    router: Router,
    config: ProxyConfig,
    pool: UpstreamPool,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: ProxyConfig) -> Result<Self, TargetError> {
        let target = Arc::new(UpstreamTarget::parse(&config.upstream.base_url)?);
        let pool = UpstreamPool::new(&config.pool, &config.timeouts);

        let allowed_methods = config
            .upstream
            .allowed_methods
            .iter()
            .filter_map(|m| Method::from_bytes(m.to_ascii_uppercase().as_bytes()).ok())
            .collect();

        let state = AppState {
            target,
            pool: pool.clone(),
            allowed_methods,
            policy: config.upstream.response_headers,
            response_timeout: Duration::from_secs(config.timeouts.response_secs),
            read_idle: Duration::from_secs(config.timeouts.read_idle_secs),
        };

        let router = Self::build_router(state);
        Ok(Self {
            router,
            config,
            pool,
        })
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(state: AppState) -> Router {
        Router::new()
            .route("/", any(proxy_handler))
            .route("/{*path}", any(proxy_handler))
            .with_state(state)
            .layer(TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                let request_id = request.request_id().map(RequestId::as_str).unwrap_or("-");
                tracing::info_span!(
                    "proxy",
                    request_id = %request_id,
                    method = %request.method(),
                    path = %request.uri().path(),
                )
            }))
            .layer(middleware::from_fn(assign_request_id))
    }

    /// Run the server until shutdown, then drain and close the pool.
    pub async fn run(
        self,
        listener: TcpListener,
        shutdown: ShutdownListener,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        let drain = Duration::from_secs(self.config.timeouts.drain_secs);
        tracing::info!(
            address = %addr,
            upstream = %self.config.upstream.base_url,
            policy = ?self.config.upstream.response_headers,
            "HTTP server starting"
        );

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        let mut graceful = shutdown.clone();
        let serve = axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let reason = graceful.recv().await;
                tracing::info!(?reason, "Shutdown signal received, draining requests");
            })
            .into_future();
        tokio::pin!(serve);

        let mut deadline = shutdown;
        let drain_elapsed = async move {
            deadline.recv().await;
            tokio::time::sleep(drain).await;
        };

        let result = tokio::select! {
            result = &mut serve => result,
            _ = drain_elapsed => {
                tracing::warn!(
                    drain_secs = drain.as_secs(),
                    in_flight = self.pool.in_flight(),
                    "Drain timeout elapsed, dropping in-flight requests"
                );
                Ok(())
            }
        };

        self.pool.close();
        tracing::info!("HTTP server stopped");
        result
    }

    /// The upstream pool shared by all requests.
    pub fn pool(&self) -> &UpstreamPool {
        &self.pool
    }
}

/// Main proxy handler.
async fn proxy_handler(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    request: Request<Body>,
) -> Response {
    let start_time = Instant::now();
    let method = request.method().clone();
    let request_id = request.request_id().cloned().unwrap_or_else(RequestId::generate);

    tracing::debug!(peer = %peer, query = ?request.uri().query(), "Proxying request");

    match forward(&state, request, request_id).await {
        Ok(response) => {
            metrics::record_request(method.as_str(), response.status().as_u16(), start_time);
            response
        }
        Err(e) => {
            match &e {
                ProxyError::MethodNotAllowed(_) => tracing::debug!(error = %e, "Rejected request"),
                ProxyError::UpstreamUnreachable(_) | ProxyError::PoolClosed => {
                    tracing::warn!(error = %e, "Upstream unavailable")
                }
                _ => tracing::error!(error = %e, "Upstream request failed"),
            }
            metrics::record_upstream_error(e.kind());
            let response = e.into_response();
            metrics::record_request(method.as_str(), response.status().as_u16(), start_time);
            response
        }
    }
}

/// Forward one request and hand back the streaming response.
async fn forward(
    state: &AppState,
    request: Request<Body>,
    request_id: RequestId,
) -> Result<Response, ProxyError> {
    if !state.allowed_methods.contains(request.method()) {
        return Err(ProxyError::MethodNotAllowed(request.method().clone()));
    }

    let (parts, body) = request.into_parts();
    let uri = state.target.uri_for(&parts.uri)?;

    // The inbound body is handed over unread; hyper pulls it as it writes.
    let mut outbound = Request::new(body);
    *outbound.method_mut() = parts.method;
    *outbound.uri_mut() = uri;
    *outbound.headers_mut() = outbound_request_headers(&parts.headers, state.policy);

    let lease = state.pool.checkout().await?;
    let response = tokio::time::timeout(state.response_timeout, state.pool.send(outbound))
        .await
        .map_err(|_| ProxyError::UpstreamTimeout(state.response_timeout))??;

    let (mut parts, body) = response.into_parts();
    tracing::debug!(status = %parts.status, "Upstream responded");
    parts.headers = relayed_response_headers(std::mem::take(&mut parts.headers), state.policy);

    let body = RelayBody::new(body, state.read_idle, request_id).with_lease(lease);
    Ok(Response::from_parts(parts, Body::new(body)))
}
