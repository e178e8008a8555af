//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! Inbound connection
//!     → server.rs (Axum setup, catch-all route)
//!     → request.rs (request ID)
//!     → rewrite policy (target URI, headers)
//!     → upstream pool (one exchange, no retry)
//!     → response.rs (RelayBody streams the upstream body back)
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::{RequestId, RequestIdExt, X_REQUEST_ID};
pub use response::{RelayBody, StreamOutcome};
pub use server::HttpServer;
