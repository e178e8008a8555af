//! Target URI construction.
//!
//! The inbound path and query are appended to the upstream base verbatim.
//! Nothing is decoded, re-encoded or normalised, so `..` segments and
//! percent escapes reach the upstream exactly as the client wrote them.

use axum::http::uri::{Authority, InvalidUri, Scheme};
use axum::http::Uri;

/// Error building the upstream target.
#[derive(Debug, thiserror::Error)]
pub enum TargetError {
    #[error("invalid upstream base URL: {0}")]
    InvalidBase(#[from] InvalidUri),

    #[error("upstream base URL must be absolute (scheme and host)")]
    NotAbsolute,

    #[error("upstream base URL must not carry a query")]
    HasQuery,

    #[error("cannot build upstream URI: {0}")]
    Build(#[from] axum::http::Error),
}

/// The fixed part of every outbound URI.
#[derive(Debug, Clone)]
pub struct UpstreamTarget {
    scheme: Scheme,
    authority: Authority,
    base_path: String,
}

impl UpstreamTarget {
    /// Parse an absolute base URL such as `http://127.0.0.1:8000` or
    /// `http://127.0.0.1:8000/prefix/`.
    pub fn parse(base_url: &str) -> Result<Self, TargetError> {
        let uri: Uri = base_url.parse()?;
        let parts = uri.into_parts();

        let (Some(scheme), Some(authority)) = (parts.scheme, parts.authority) else {
            return Err(TargetError::NotAbsolute);
        };

        let base_path = match parts.path_and_query {
            Some(pq) if pq.query().is_some() => return Err(TargetError::HasQuery),
            Some(pq) => pq.path().trim_end_matches('/').to_string(),
            None => String::new(),
        };

        Ok(Self {
            scheme,
            authority,
            base_path,
        })
    }

    /// Outbound URI for an inbound request URI. Only the inbound path and raw
    /// query are used; any scheme or authority on the inbound URI is ignored.
    pub fn uri_for(&self, inbound: &Uri) -> Result<Uri, TargetError> {
        let path_and_query = inbound
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or("/");
        self.join(path_and_query)
    }

    /// Outbound URI for a fixed path such as the health endpoint.
    pub fn uri_for_path(&self, path: &str) -> Result<Uri, TargetError> {
        self.join(path)
    }

    /// Upstream port, defaulted from the scheme when the URL omits it.
    pub fn port(&self) -> u16 {
        self.authority.port_u16().unwrap_or(if self.scheme == Scheme::HTTPS {
            443
        } else {
            80
        })
    }

    fn join(&self, path_and_query: &str) -> Result<Uri, TargetError> {
        let joined = if path_and_query.starts_with('/') {
            format!("{}{}", self.base_path, path_and_query)
        } else {
            format!("{}/{}", self.base_path, path_and_query)
        };

        Ok(Uri::builder()
            .scheme(self.scheme.clone())
            .authority(self.authority.clone())
            .path_and_query(joined)
            .build()?)
    }
}
