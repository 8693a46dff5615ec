//! Configuration loading from disk.

use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::config::schema::ProxyConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
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
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Parse and validate configuration from TOML text.
pub fn parse_config(content: &str) -> Result<ProxyConfig, ConfigError> {
    let config: ProxyConfig = toml::from_str(content)?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<ProxyConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    parse_config(&content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::SelectionStrategy;

    #[test]
    fn test_empty_file_yields_defaults() {
        let config = parse_config("").unwrap();
        assert_eq!(config, ProxyConfig::default());
    }

    #[test]
    fn test_partial_override() {
        let config = parse_config(
            r#"
            [listener]
            path = "/api/overpass"

            [upstream]
            endpoints = ["https://one.example/api/interpreter", "https://two.example/api/interpreter"]
            attempt_timeout_ms = 10000
            selection = "round_robin"

            [query]
            max_statements = 20
            "#,
        )
        .unwrap();

        assert_eq!(config.listener.path, "/api/overpass");
        assert_eq!(config.listener.bind_address, "0.0.0.0:8080");
        assert_eq!(config.upstream.endpoints.len(), 2);
        assert_eq!(config.upstream.attempt_timeout_ms, 10_000);
        assert_eq!(config.upstream.max_attempts, 3);
        assert_eq!(config.upstream.selection, SelectionStrategy::RoundRobin);
        assert_eq!(config.query.max_statements, 20);
        assert_eq!(config.query.max_length, 10_000);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let err = parse_config("[upstream]\nendpoints = []\n").unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
        assert!(err.to_string().contains("must not be empty"));
    }

    #[test]
    fn test_syntax_error() {
        let err = parse_config("[upstream\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_missing_file() {
        let err = load_config(Path::new("/nonexistent/overpass-proxy.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
