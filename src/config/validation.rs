//! Configuration validation.
//!
//! Serde handles the syntax; this module checks what serde cannot: that the
//! upstream URL is usable, the method list parses, and every duration is
//! non-zero. All errors are collected, not just the first.

use std::net::SocketAddr;

use axum::http::Method;
use url::Url;

use crate::config::schema::ProxyConfig;

/// Upper bound for any duration given in seconds (one year).
pub const MAX_DURATION_SECS: u64 = 365 * 24 * 60 * 60;

/// A single semantic problem in a loaded configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Validate a configuration, returning every problem found.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("not a socket address: {}", config.listener.bind_address),
        ));
    }

    match Url::parse(&config.upstream.base_url) {
        Ok(url) => {
            if url.scheme() != "http" {
                errors.push(ValidationError::new(
                    "upstream.base_url",
                    format!("unsupported scheme {}", url.scheme()),
                ));
            }
            if url.host_str().is_none() {
                errors.push(ValidationError::new("upstream.base_url", "missing host"));
            }
            if url.query().is_some() || url.fragment().is_some() {
                errors.push(ValidationError::new(
                    "upstream.base_url",
                    "must not carry a query or fragment",
                ));
            }
        }
        Err(e) => errors.push(ValidationError::new("upstream.base_url", e.to_string())),
    }

    if config.upstream.allowed_methods.is_empty() {
        errors.push(ValidationError::new("upstream.allowed_methods", "must not be empty"));
    }
    for method in &config.upstream.allowed_methods {
        if Method::from_bytes(method.to_ascii_uppercase().as_bytes()).is_err() {
            errors.push(ValidationError::new(
                "upstream.allowed_methods",
                format!("invalid method {method}"),
            ));
        }
    }

    let durations = [
        ("timeouts.connect_secs", config.timeouts.connect_secs),
        ("timeouts.response_secs", config.timeouts.response_secs),
        ("timeouts.read_idle_secs", config.timeouts.read_idle_secs),
        ("pool.idle_timeout_secs", config.pool.idle_timeout_secs),
        ("health_check.timeout_ms", config.health_check.timeout_ms),
        ("backoff.base_delay_ms", config.backoff.base_delay_ms),
        (
            "supervisor.terminate_timeout_secs",
            config.supervisor.terminate_timeout_secs,
        ),
    ];
    for (field, value) in durations {
        if value == 0 {
            errors.push(ValidationError::new(field, "must be greater than zero"));
        }
    }

    let bounded_secs = [
        ("timeouts.connect_secs", config.timeouts.connect_secs),
        ("timeouts.response_secs", config.timeouts.response_secs),
        ("timeouts.read_idle_secs", config.timeouts.read_idle_secs),
        ("timeouts.drain_secs", config.timeouts.drain_secs),
        ("pool.idle_timeout_secs", config.pool.idle_timeout_secs),
        (
            "health_check.startup_deadline_secs",
            config.health_check.startup_deadline_secs,
        ),
        ("supervisor.grace_period_secs", config.supervisor.grace_period_secs),
        (
            "supervisor.terminate_timeout_secs",
            config.supervisor.terminate_timeout_secs,
        ),
    ];
    for (field, value) in bounded_secs {
        if value > MAX_DURATION_SECS {
            errors.push(ValidationError::new(
                field,
                format!("must not exceed {MAX_DURATION_SECS} seconds"),
            ));
        }
    }

    if config.backoff.max_delay_ms < config.backoff.base_delay_ms {
        errors.push(ValidationError::new(
            "backoff.max_delay_ms",
            "must not be smaller than base_delay_ms",
        ));
    }

    if config.pool.max_connections == 0 {
        errors.push(ValidationError::new("pool.max_connections", "must be greater than zero"));
    }

    if !config.health_check.path.starts_with('/') {
        errors.push(ValidationError::new("health_check.path", "must start with '/'"));
    }

    if config.supervisor.enabled && config.supervisor.command.is_empty() {
        errors.push(ValidationError::new(
            "supervisor.command",
            "required when the supervisor is enabled",
        ));
    }

    if config.admin.enabled && config.admin.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "admin.bind_address",
            format!("not a socket address: {}", config.admin.bind_address),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
