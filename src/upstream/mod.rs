//! Upstream connection management.
//!
//! # Data Flow
//! ```text
//! proxy handler
//!     → pool.rs checkout (bounded, waits when saturated)
//!     → pooled hyper client (connect timeout, idle expiry)
//!     → response head back to the handler
//!     → lease moves into the relayed body, released when it ends
//! ```
//!
//! # Design Decisions
//! - One pool for the process, created at startup and closed at shutdown
//! - Connections are reused when a body is read to the end and discarded otherwise
//! - No retries: one checkout, one exchange

pub mod pool;

pub use pool::{PoolLease, UpstreamPool};
