//! Startup readiness wait.
//!
//! Polls the prober with backoff until the upstream answers for the first
//! time. Purely informational: traffic is proxied from the start and simply
//! gets 502 until the upstream listens.

use std::time::{Duration, Instant};

use crate::health::probe::HealthProber;
use crate::lifecycle::ShutdownListener;
use crate::observability::metrics;
use crate::resilience::Backoff;

/// Wait for the first successful probe. Returns `false` on deadline or shutdown.
pub async fn wait_until_ready(
    prober: HealthProber,
    backoff: Backoff,
    deadline: Duration,
    mut shutdown: ShutdownListener,
) -> bool {
    let started = Instant::now();
    metrics::set_upstream_ready(false);
    tracing::info!(uri = %prober.uri(), "Waiting for upstream to become ready");

    let mut attempt = 0;
    loop {
        if prober.probe().await {
            tracing::info!(
                elapsed_secs = started.elapsed().as_secs_f64(),
                attempts = attempt + 1,
                "Upstream ready"
            );
            metrics::set_upstream_ready(true);
            return true;
        }

        attempt += 1;
        let delay = backoff.delay(attempt);
        if started.elapsed() + delay > deadline {
            tracing::warn!(
                deadline_secs = deadline.as_secs(),
                attempts = attempt,
                "Upstream not ready before startup deadline"
            );
            return false;
        }

        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = shutdown.recv() => return false,
        }
    }
}
