//! Header rewrite rules for both legs of a proxied exchange.

use axum::http::{header, HeaderMap, HeaderName, HeaderValue};

use crate::config::ResponseHeaderPolicy;

/// Framing headers the serving layer owns under [`ResponseHeaderPolicy::Reframe`].
const REFRAMED: [HeaderName; 3] = [
    header::CONTENT_ENCODING,
    header::CONTENT_LENGTH,
    header::TRANSFER_ENCODING,
];

/// Build the header set sent upstream.
///
/// `Host` is always dropped; the client connection layer derives it from the
/// target URI. Body framing headers are kept because the body is relayed in
/// exactly the shape the client sent it. Duplicate header values survive.
pub fn outbound_request_headers(inbound: &HeaderMap, policy: ResponseHeaderPolicy) -> HeaderMap {
    let mut headers = inbound.clone();
    headers.remove(header::HOST);

    if policy == ResponseHeaderPolicy::Reframe {
        headers.insert(header::ACCEPT_ENCODING, HeaderValue::from_static("identity"));
    }

    headers
}

/// Filter the upstream response headers before they reach the client.
pub fn relayed_response_headers(
    mut upstream: HeaderMap,
    policy: ResponseHeaderPolicy,
) -> HeaderMap {
    if policy == ResponseHeaderPolicy::Reframe {
        for name in REFRAMED {
            upstream.remove(name);
        }
    }
    upstream
}
