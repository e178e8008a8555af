//! Error types for the request path.
//!
//! Process-level failures live with the supervisor
//! ([`crate::supervisor::SupervisorError`]) and startup
//! ([`crate::lifecycle::startup::StartupError`]); everything here is local to
//! one proxied request and never leaks past it.

use std::time::Duration;

use axum::http::{Method, StatusCode};
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::rewrite::TargetError;

/// Errors that end a proxied request before any response bytes were sent.
#[derive(Error, Debug)]
pub enum ProxyError {
    #[error("method {0} is not proxied")]
    MethodNotAllowed(Method),

    #[error("cannot build upstream request: {0}")]
    Target(#[from] TargetError),

    #[error("upstream unreachable: {0}")]
    UpstreamUnreachable(#[source] hyper_util::client::legacy::Error),

    #[error("upstream protocol error: {0}")]
    UpstreamProtocol(#[source] hyper_util::client::legacy::Error),

    #[error("upstream did not respond within {0:?}")]
    UpstreamTimeout(Duration),

    #[error("upstream pool closed")]
    PoolClosed,
}

impl ProxyError {
    /// Sort a client error into the unreachable/protocol split.
    pub fn from_client(err: hyper_util::client::legacy::Error) -> Self {
        if err.is_connect() {
            ProxyError::UpstreamUnreachable(err)
        } else {
            ProxyError::UpstreamProtocol(err)
        }
    }

    /// Status code shown to the client.
    pub fn status(&self) -> StatusCode {
        match self {
            ProxyError::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            ProxyError::UpstreamUnreachable(_) => StatusCode::BAD_GATEWAY,
            ProxyError::Target(_)
            | ProxyError::UpstreamProtocol(_)
            | ProxyError::UpstreamTimeout(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ProxyError::PoolClosed => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Short label used in logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            ProxyError::MethodNotAllowed(_) => "method_not_allowed",
            ProxyError::Target(_) => "target",
            ProxyError::UpstreamUnreachable(_) => "unreachable",
            ProxyError::UpstreamProtocol(_) => "protocol",
            ProxyError::UpstreamTimeout(_) => "timeout",
            ProxyError::PoolClosed => "pool_closed",
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let status = self.status();
        let reason = status.canonical_reason().unwrap_or("Error");
        (status, reason).into_response()
    }
}
