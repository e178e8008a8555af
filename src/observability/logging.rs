//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the tracing subscriber once per process
//! - Pick pretty or JSON output from config
//!
//! # Design Decisions
//! - `RUST_LOG` wins over the configured level
//! - Re-initialization is a no-op so tests can call this freely

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{LogFormat, ObservabilityConfig};

/// Default filter when `RUST_LOG` is unset.
fn default_filter(level: &str) -> String {
    format!("upstream_proxy={level},tower_http={level},warn")
}

/// Install the global subscriber. Returns `false` if one was already set.
pub fn init_logging(config: &ObservabilityConfig) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_filter(&config.log_level).into());

    let registry = tracing_subscriber::registry().with(filter);
    let installed = match config.log_format {
        LogFormat::Pretty => registry
            .with(tracing_subscriber::fmt::layer().with_target(false))
            .try_init(),
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(false),
            )
            .try_init(),
    };

    installed.is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_names_crate_and_level() {
        assert_eq!(
            default_filter("debug"),
            "upstream_proxy=debug,tower_http=debug,warn"
        );
        assert!(EnvFilter::try_new(default_filter("info")).is_ok());
    }

    #[test]
    fn second_init_is_noop() {
        let config = ObservabilityConfig::default();
        init_logging(&config);
        assert!(!init_logging(&config));
    }
}
