//! Startup orchestration.
//!
//! # Responsibilities
//! - Launch the supervised upstream before anything accepts traffic
//! - Start background tasks (readiness wait, metrics, probe listener)
//! - Bind listeners and serve until shutdown
//! - Stop the upstream after the proxy has drained
//!
//! # Design Decisions
//! - Fail fast: launch and bind errors are fatal
//! - Traffic is accepted immediately; requests get 502 until the upstream listens

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;

use crate::admin::{serve_probes, ProbeState};
use crate::config::ProxyConfig;
use crate::health::{wait_until_ready, HealthProber};
use crate::http::HttpServer;
use crate::lifecycle::shutdown::{Shutdown, ShutdownReason};
use crate::lifecycle::signals::spawn_signal_listener;
use crate::observability::metrics;
use crate::resilience::Backoff;
use crate::rewrite::{TargetError, UpstreamTarget};
use crate::supervisor::{LaunchSpec, SupervisorError, UpstreamSupervisor};

/// Fatal startup or serving failure.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error(transparent)]
    Target(#[from] TargetError),

    #[error(transparent)]
    Supervisor(#[from] SupervisorError),

    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("server error: {0}")]
    Serve(#[source] std::io::Error),
}

/// How the service ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOutcome {
    pub reason: ShutdownReason,
    /// The supervised upstream was dead before shutdown began.
    pub upstream_died: bool,
}

impl RunOutcome {
    /// Process exit code: 0 for an external shutdown, 1 when the upstream died.
    pub fn exit_code(&self) -> u8 {
        if self.upstream_died {
            1
        } else {
            0
        }
    }
}

/// Run the service with OS signal handling until it shuts down.
pub async fn run(config: ProxyConfig) -> Result<RunOutcome, StartupError> {
    let shutdown = Shutdown::new();
    let signals = spawn_signal_listener(shutdown.clone());
    let outcome = run_with_shutdown(config, shutdown).await;
    signals.abort();
    outcome
}

/// Run the service until `shutdown` fires.
pub async fn run_with_shutdown(
    config: ProxyConfig,
    shutdown: Shutdown,
) -> Result<RunOutcome, StartupError> {
    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse::<SocketAddr>() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let target = UpstreamTarget::parse(&config.upstream.base_url)?;

    let supervisor = if config.supervisor.enabled {
        let spec = LaunchSpec::from_config(&config.supervisor, target.port())?;
        Some(UpstreamSupervisor::launch(&spec, &config.supervisor, &shutdown)?)
    } else {
        tracing::info!(
            upstream = %config.upstream.base_url,
            "Supervisor disabled, upstream managed externally"
        );
        None
    };

    let prober = HealthProber::new(&target, &config.health_check)?;
    let readiness = tokio::spawn(wait_until_ready(
        prober.clone(),
        Backoff::from_config(&config.backoff),
        Duration::from_secs(config.health_check.startup_deadline_secs),
        shutdown.subscribe(),
    ));

    let listener = bind(&config.listener.bind_address).await?;
    let server = HttpServer::new(config.clone())?;

    let probes = if config.admin.enabled {
        let admin_listener = bind(&config.admin.bind_address).await?;
        let state = ProbeState {
            prober,
            process: supervisor.as_ref().map(UpstreamSupervisor::subscribe),
            pool: server.pool().clone(),
            upstream: Arc::from(config.upstream.base_url.as_str()),
        };
        Some(tokio::spawn(serve_probes(
            admin_listener,
            state,
            shutdown.subscribe(),
        )))
    } else {
        None
    };

    let served = server.run(listener, shutdown.subscribe()).await;
    if let Err(e) = &served {
        tracing::error!(error = %e, "Proxy listener failed");
        shutdown.trigger(ShutdownReason::ServerError);
    }
    // Make sure every other task sees the shutdown.
    shutdown.trigger(ShutdownReason::Signal);
    let reason = shutdown.reason().unwrap_or(ShutdownReason::Signal);

    let upstream_died = matches!(reason, ShutdownReason::UpstreamExited { .. })
        || supervisor
            .as_ref()
            .is_some_and(|s| !s.state().is_alive());

    if let Some(supervisor) = supervisor {
        let state = supervisor.terminate().await;
        tracing::info!(state = state.label(), "Upstream process stopped");
    }

    readiness.abort();
    if let Some(probes) = probes {
        match probes.await {
            Ok(Err(e)) => tracing::warn!(error = %e, "Probe listener failed"),
            Err(e) => tracing::warn!(error = %e, "Probe listener task failed"),
            Ok(Ok(())) => {}
        }
    }

    served.map_err(StartupError::Serve)?;
    tracing::info!(?reason, upstream_died, "Shutdown complete");
    Ok(RunOutcome {
        reason,
        upstream_died,
    })
}

async fn bind(addr: &str) -> Result<TcpListener, StartupError> {
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| StartupError::Bind {
            addr: addr.to_string(),
            source,
        })?;
    tracing::info!(address = %addr, "Listening for connections");
    Ok(listener)
}
