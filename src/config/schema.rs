//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the proxy.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the upstream proxy.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ProxyConfig {
    /// Public listener configuration.
    pub listener: ListenerConfig,

    /// The single upstream this proxy forwards to.
    pub upstream: UpstreamConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Upstream connection pool.
    pub pool: PoolConfig,

    /// Health probe settings.
    pub health_check: HealthCheckConfig,

    /// Backoff used while waiting for the upstream to become ready.
    pub backoff: BackoffConfig,

    /// Upstream process supervision.
    pub supervisor: SupervisorConfig,

    /// Probe listener.
    pub admin: AdminConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:3000").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:3000".to_string(),
        }
    }
}

/// How upstream response headers are relayed to the client.
///
/// Exactly one policy applies to a deployment. Mixing them per request is
/// what corrupts framing (double-encoded or truncated bodies).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ResponseHeaderPolicy {
    /// Relay every upstream header unchanged alongside the raw body bytes.
    #[default]
    Passthrough,
    /// Drop `content-encoding`, `content-length` and `transfer-encoding` and
    /// let the serving layer frame the body itself. Outbound requests ask for
    /// `accept-encoding: identity` so the relayed bytes match.
    Reframe,
}

/// Upstream definition.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Base URL (scheme, host, port and optional path prefix).
    pub base_url: String,

    /// Methods the proxy accepts. Anything else is answered with 405.
    pub allowed_methods: Vec<String>,

    /// Response header policy for this deployment.
    pub response_headers: ResponseHeaderPolicy,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8000".to_string(),
            allowed_methods: ["GET", "POST", "PUT", "DELETE", "OPTIONS", "HEAD", "PATCH"]
                .iter()
                .map(|m| m.to_string())
                .collect(),
            response_headers: ResponseHeaderPolicy::default(),
        }
    }
}

/// Timeout configuration for the proxy path.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Upstream connection establishment timeout in seconds.
    pub connect_secs: u64,

    /// Maximum wait for the upstream response head, in seconds.
    pub response_secs: u64,

    /// Maximum silence between two upstream body frames, in seconds.
    pub read_idle_secs: u64,

    /// Bound on draining in-flight requests during shutdown, in seconds.
    pub drain_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_secs: 5,
            response_secs: 300,
            read_idle_secs: 300,
            drain_secs: 30,
        }
    }
}

/// Upstream connection pool configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Maximum concurrently checked-out upstream exchanges.
    pub max_connections: usize,

    /// Maximum idle connections kept for reuse.
    pub max_idle: usize,

    /// Idle connections are closed after this many seconds.
    pub idle_timeout_secs: u64,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_connections: 512,
            max_idle: 32,
            idle_timeout_secs: 90,
        }
    }
}

/// Health probe configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HealthCheckConfig {
    /// Path on the upstream to probe.
    pub path: String,

    /// Probe timeout in milliseconds.
    pub timeout_ms: u64,

    /// How long the startup readiness wait keeps polling, in seconds.
    pub startup_deadline_secs: u64,
}

impl Default for HealthCheckConfig {
    fn default() -> Self {
        Self {
            path: "/v1/health".to_string(),
            timeout_ms: 1000,
            startup_deadline_secs: 1800,
        }
    }
}

/// Exponential backoff parameters.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BackoffConfig {
    /// Delay before the first retry in milliseconds.
    pub base_delay_ms: u64,

    /// Upper bound for any single delay in milliseconds.
    pub max_delay_ms: u64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            base_delay_ms: 250,
            max_delay_ms: 5000,
        }
    }
}

/// What the supervisor does once the grace period after upstream death ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum EscalationMode {
    /// Trigger the in-process shutdown coordinator.
    #[default]
    Cooperative,
    /// Send SIGTERM to the hosting process.
    Signal,
}

/// Upstream process supervision.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SupervisorConfig {
    /// Launch and supervise the upstream process.
    pub enabled: bool,

    /// Program followed by its arguments. `${PORT}` is replaced by the
    /// upstream port.
    pub command: Vec<String>,

    /// Environment variables that must be present before launch.
    pub required_env: Vec<String>,

    /// Wait after upstream exit before escalating, in seconds.
    pub grace_period_secs: u64,

    /// Wait between SIGTERM and SIGKILL when stopping the upstream, in seconds.
    pub terminate_timeout_secs: u64,

    /// Escalation mode after the grace period.
    pub escalation: EscalationMode,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            command: Vec::new(),
            required_env: Vec::new(),
            grace_period_secs: 60,
            terminate_timeout_secs: 5,
            escalation: EscalationMode::default(),
        }
    }
}

/// Probe listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Serve `/livez`, `/readyz` and `/status`.
    pub enabled: bool,

    /// Probe listener bind address.
    pub bind_address: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            bind_address: "0.0.0.0:3001".to_string(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error). `RUST_LOG` wins if set.
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Enable the Prometheus endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::default(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
