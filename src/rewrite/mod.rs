//! Header and URL rewrite policy.
//!
//! # Data Flow
//! ```text
//! Inbound request (method, uri, headers, body)
//!     → url.rs (base URL + raw path and query → absolute upstream URI)
//!     → headers.rs (drop Host, apply response header policy)
//!     → OutboundRequest
//!
//! Upstream response headers
//!     → headers.rs (passthrough, or strip framing headers under reframe)
//!     → client
//! ```
//!
//! # Design Decisions
//! - Pure functions, no I/O
//! - One response header policy per deployment, chosen in config
//! - No path normalisation and no query re-encoding

pub mod headers;
pub mod url;

pub use headers::{outbound_request_headers, relayed_response_headers};
pub use self::url::{TargetError, UpstreamTarget};
