//! Resilience helpers.
//!
//! # Design Decisions
//! - The request path never retries; each inbound request maps to exactly one
//!   upstream request
//! - Backoff is only used for out-of-band polling (startup readiness wait)

pub mod backoff;

pub use backoff::Backoff;
