//! Request identification.
//!
//! # Responsibilities
//! - Reuse the client's `x-request-id` or generate a UUID v4
//! - Make the id available to handlers and spans via request extensions
//! - Echo the id on the response
//!
//! # Design Decisions
//! - The id is never injected into the request headers, so the header set
//!   forwarded upstream is exactly what the client sent (minus `Host`)
//! - Request ID attached as early as possible for tracing

use std::fmt;

use axum::extract::Request;
use axum::http::{HeaderName, HeaderValue};
use axum::middleware::Next;
use axum::response::Response;
use uuid::Uuid;

/// Header carrying the request id.
pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Identifier attached to every proxied request.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RequestId(String);

impl RequestId {
    /// Generate a fresh id.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Access the request id stored by [`assign_request_id`].
pub trait RequestIdExt {
    fn request_id(&self) -> Option<&RequestId>;
}

impl<B> RequestIdExt for axum::http::Request<B> {
    fn request_id(&self) -> Option<&RequestId> {
        self.extensions().get::<RequestId>()
    }
}

/// Middleware attaching a [`RequestId`] to the request and its response.
pub async fn assign_request_id(mut request: Request, next: Next) -> Response {
    let id = request
        .headers()
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(|v| RequestId(v.to_string()))
        .unwrap_or_else(RequestId::generate);

    request.extensions_mut().insert(id.clone());
    let mut response = next.run(request).await;

    if !response.headers().contains_key(X_REQUEST_ID) {
        if let Ok(value) = HeaderValue::from_str(id.as_str()) {
            response.headers_mut().insert(X_REQUEST_ID, value);
        }
    }
    response
}
