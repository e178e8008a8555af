//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML) + CLI overrides
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → ProxyConfig (validated, immutable)
//!     → shared via Arc to all subsystems
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; there is no hot reload
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{parse_config, resolve_config, ConfigError};
pub use schema::{
    AdminConfig, BackoffConfig, EscalationMode, HealthCheckConfig, ListenerConfig, LogFormat,
    ObservabilityConfig, PoolConfig, ProxyConfig, ResponseHeaderPolicy, SupervisorConfig,
    TimeoutConfig, UpstreamConfig,
};
pub use validation::{validate_config, ValidationError};
