//! Probe listener: `/livez`, `/readyz` and `/status`.
//!
//! Served on its own bind address so probe paths never shadow upstream
//! paths on the proxy listener.

pub mod handlers;

use std::sync::Arc;

use axum::{routing::get, Router};
use tokio::net::TcpListener;
use tokio::sync::watch;

use crate::health::HealthProber;
use crate::lifecycle::ShutdownListener;
use crate::supervisor::ProcessState;
use crate::upstream::UpstreamPool;

use self::handlers::{livez, readyz, status};

/// Shared state for the probe handlers.
#[derive(Clone)]
pub struct ProbeState {
    pub prober: HealthProber,
    /// `None` when the upstream is not supervised by this process.
    pub process: Option<watch::Receiver<ProcessState>>,
    pub pool: UpstreamPool,
    pub upstream: Arc<str>,
}

pub fn probe_router(state: ProbeState) -> Router {
    Router::new()
        .route("/livez", get(livez))
        .route("/readyz", get(readyz))
        .route("/status", get(status))
        .with_state(state)
}

/// Serve the probe router until shutdown.
pub async fn serve_probes(
    listener: TcpListener,
    state: ProbeState,
    mut shutdown: ShutdownListener,
) -> std::io::Result<()> {
    tracing::info!(address = %listener.local_addr()?, "Probe listener starting");
    axum::serve(listener, probe_router(state))
        .with_graceful_shutdown(async move {
            shutdown.recv().await;
        })
        .await
}
