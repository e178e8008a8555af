//! Upstream health probe.
//!
//! # Responsibilities
//! - Issue one GET against the upstream health path
//! - Fold every failure (timeout, connect error, non-200) into `false`

use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode, Uri};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use tokio::time;

use crate::config::HealthCheckConfig;
use crate::rewrite::{TargetError, UpstreamTarget};

/// Stateless readiness check against the upstream. Cheap to clone and safe
/// to call concurrently.
#[derive(Clone)]
pub struct HealthProber {
    client: Client<HttpConnector, Body>,
    uri: Uri,
    timeout: Duration,
}

impl HealthProber {
    pub fn new(target: &UpstreamTarget, config: &HealthCheckConfig) -> Result<Self, TargetError> {
        let timeout = Duration::from_millis(config.timeout_ms);
        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(Some(timeout));

        // Separate from the proxy pool: probes must not queue behind traffic.
        let client = Client::builder(TokioExecutor::new())
            .pool_max_idle_per_host(1)
            .build(connector);

        Ok(Self {
            client,
            uri: target.uri_for_path(&config.path)?,
            timeout,
        })
    }

    /// The probed URI.
    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    /// Returns `true` only on HTTP 200 within the timeout.
    pub async fn probe(&self) -> bool {
        let request = match Request::builder()
            .method(Method::GET)
            .uri(self.uri.clone())
            .header(header::USER_AGENT, "upstream-proxy-health-check")
            .body(Body::empty())
        {
            Ok(req) => req,
            Err(e) => {
                tracing::error!(error = %e, "Failed to build health check request");
                return false;
            }
        };

        match time::timeout(self.timeout, self.client.request(request)).await {
            Ok(Ok(response)) => {
                let healthy = response.status() == StatusCode::OK;
                if !healthy {
                    tracing::debug!(
                        uri = %self.uri,
                        status = %response.status(),
                        "Health check failed: non-200 status"
                    );
                }
                healthy
            }
            Ok(Err(e)) => {
                tracing::debug!(
                    uri = %self.uri,
                    error = %e,
                    "Health check failed: connection error"
                );
                false
            }
            Err(_) => {
                tracing::debug!(
                    uri = %self.uri,
                    timeout_ms = self.timeout.as_millis() as u64,
                    "Health check failed: timeout"
                );
                false
            }
        }
    }
}
