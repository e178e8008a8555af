//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use crate::config::schema::ProxyConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join(.0))]
    Validation(Vec<ValidationError>),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load the file if given (defaults otherwise), apply `overrides`, then
/// validate. Used by the binary so CLI flags win over the file.
pub fn resolve_config<F>(path: Option<&Path>, overrides: F) -> Result<ProxyConfig, ConfigError>
where
    F: FnOnce(&mut ProxyConfig),
{
    let mut config = match path {
        Some(path) => toml::from_str(&fs::read_to_string(path)?)?,
        None => ProxyConfig::default(),
    };
    overrides(&mut config);
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Parse and validate configuration from TOML text.
pub fn parse_config(content: &str) -> Result<ProxyConfig, ConfigError> {
    let config: ProxyConfig = toml::from_str(content)?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::{EscalationMode, ResponseHeaderPolicy};

    #[test]
    fn parses_full_file() {
        let config = parse_config(
            r#"
            [listener]
            bind_address = "127.0.0.1:3000"

            [upstream]
            base_url = "http://127.0.0.1:8000"
            response_headers = "reframe"

            [timeouts]
            response_secs = 120

            [supervisor]
            command = ["max", "serve", "--port", "${PORT}"]
            required_env = ["HF_TOKEN"]
            grace_period_secs = 30
            escalation = "signal"
            "#,
        )
        .unwrap();

        assert_eq!(config.upstream.response_headers, ResponseHeaderPolicy::Reframe);
        assert_eq!(config.timeouts.response_secs, 120);
        assert_eq!(config.timeouts.connect_secs, 5);
        assert_eq!(config.supervisor.command.len(), 4);
        assert_eq!(config.supervisor.escalation, EscalationMode::Signal);
        assert_eq!(config.health_check.path, "/v1/health");
    }

    #[test]
    fn validation_errors_surface() {
        let err = parse_config("[supervisor]\nenabled = true\n").unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
        assert!(err.to_string().contains("supervisor.command"));
    }

    #[test]
    fn syntax_errors_surface() {
        let err = parse_config("[listener\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn overrides_apply_before_validation() {
        let config = resolve_config(None, |config| {
            config.supervisor.enabled = false;
            config.upstream.base_url = "http://127.0.0.1:9000".into();
        })
        .unwrap();
        assert_eq!(config.upstream.base_url, "http://127.0.0.1:9000");

        assert!(resolve_config(None, |_| {}).is_err());
    }

    #[test]
    fn file_values_lose_to_overrides() {
        let path = std::env::temp_dir().join(format!("upstream-proxy-{}.toml", std::process::id()));
        fs::write(
            &path,
            "[upstream]\nbase_url = \"http://127.0.0.1:8000\"\n[supervisor]\nenabled = false\n",
        )
        .unwrap();

        let from_file = resolve_config(Some(&path), |_| {}).unwrap();
        let overridden = resolve_config(Some(&path), |config| {
            config.upstream.base_url = "http://127.0.0.1:9000".into();
        })
        .unwrap();
        let missing = resolve_config(Some(Path::new("/nonexistent/proxy.toml")), |_| {});
        let _ = fs::remove_file(&path);

        assert_eq!(from_file.upstream.base_url, "http://127.0.0.1:8000");
        assert_eq!(overridden.upstream.base_url, "http://127.0.0.1:9000");
        assert!(matches!(missing, Err(ConfigError::Io(_))));
    }
}
