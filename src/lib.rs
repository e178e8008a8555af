//! Streaming reverse proxy for a single supervised upstream.

// Core subsystems
pub mod config;
pub mod error;
pub mod http;
pub mod rewrite;
pub mod upstream;

// Upstream management
pub mod health;
pub mod supervisor;

// Cross-cutting concerns
pub mod admin;
pub mod lifecycle;
pub mod observability;
pub mod resilience;

pub use config::schema::ProxyConfig;
pub use error::ProxyError;
pub use health::HealthProber;
pub use http::HttpServer;
pub use lifecycle::{Shutdown, ShutdownReason};
pub use supervisor::UpstreamSupervisor;
