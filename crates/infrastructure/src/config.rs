//! Run configuration from the environment.
//!
//! Recognized variables:
//! - `GATEWAY_URL`: gateway under test (default `http://127.0.0.1:8080`)
//! - `SUBDOMAIN_GATEWAY_URL`: subdomain gateway, if any
//! - `CONFORMANCE_TIMEOUT_MS`: per-request timeout (default 30000)
//! - `CONFORMANCE_MAX_CONCURRENCY`: concurrent chains (default 8)

use config::{Config, Environment, Map};
use conformance_application::config::{
    DEFAULT_GATEWAY_URL, DEFAULT_MAX_CONCURRENCY, DEFAULT_TIMEOUT_MS, parse_url,
};
use conformance_application::{ApplicationError, ApplicationResult, RunConfig};
use serde::Deserialize;
use tracing::debug;

#[derive(Debug, Deserialize)]
struct Settings {
    gateway_url: String,
    #[serde(default)]
    subdomain_gateway_url: Option<String>,
    conformance_timeout_ms: u64,
    conformance_max_concurrency: usize,
}

/// Loads the run configuration from the process environment.
///
/// # Errors
///
/// Returns [`ApplicationError::Config`] if a variable is malformed.
pub fn load_config() -> ApplicationResult<RunConfig> {
    load(Environment::default())
}

/// Loads the run configuration from an explicit variable map.
///
/// # Errors
///
/// Returns [`ApplicationError::Config`] if a variable is malformed.
pub fn load_config_from(vars: Map<String, String>) -> ApplicationResult<RunConfig> {
    load(Environment::default().source(Some(vars)))
}

fn load(environment: Environment) -> ApplicationResult<RunConfig> {
    let settings: Settings = Config::builder()
        .set_default("gateway_url", DEFAULT_GATEWAY_URL)
        .and_then(|b| b.set_default("conformance_timeout_ms", DEFAULT_TIMEOUT_MS))
        .and_then(|b| {
            b.set_default(
                "conformance_max_concurrency",
                u64::try_from(DEFAULT_MAX_CONCURRENCY).unwrap_or(u64::MAX),
            )
        })
        .map_err(config_error)?
        .add_source(environment.try_parsing(true))
        .build()
        .and_then(Config::try_deserialize::<Settings>)
        .map_err(config_error)?;

    let mut config = RunConfig::new(parse_url("GATEWAY_URL", &settings.gateway_url)?)
        .with_timeout_ms(settings.conformance_timeout_ms)
        .with_max_concurrency(settings.conformance_max_concurrency);

    if let Some(subdomain) = settings.subdomain_gateway_url.filter(|s| !s.trim().is_empty()) {
        config = config.with_subdomain_url(parse_url("SUBDOMAIN_GATEWAY_URL", &subdomain)?);
    }

    config.validate()?;
    debug!(?config, "loaded configuration");
    Ok(config)
}

fn config_error(error: config::ConfigError) -> ApplicationError {
    ApplicationError::Config(error.to_string())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn vars(pairs: &[(&str, &str)]) -> Map<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn test_defaults() {
        let config = load_config_from(vars(&[])).unwrap();
        assert_eq!(config.gateway_url.as_str(), "http://127.0.0.1:8080/");
        assert_eq!(config.subdomain_url, None);
        assert_eq!(config.timeout_ms, 30_000);
        assert_eq!(config.max_concurrency, 8);
    }

    #[test]
    fn test_environment_overrides() {
        let config = load_config_from(vars(&[
            ("GATEWAY_URL", "http://gateway.example:9000"),
            ("SUBDOMAIN_GATEWAY_URL", "http://example.localhost:9000"),
            ("CONFORMANCE_TIMEOUT_MS", "1500"),
            ("CONFORMANCE_MAX_CONCURRENCY", "2"),
        ]))
        .unwrap();
        assert_eq!(config.gateway_url.as_str(), "http://gateway.example:9000/");
        assert_eq!(
            config.subdomain_url.map(|u| u.to_string()),
            Some("http://example.localhost:9000/".to_string())
        );
        assert_eq!(config.timeout_ms, 1500);
        assert_eq!(config.max_concurrency, 2);
    }

    #[test]
    fn test_malformed_values_are_config_errors() {
        assert!(matches!(
            load_config_from(vars(&[("GATEWAY_URL", "not a url")])),
            Err(ApplicationError::Config(_))
        ));
        assert!(matches!(
            load_config_from(vars(&[("CONFORMANCE_TIMEOUT_MS", "soon")])),
            Err(ApplicationError::Config(_))
        ));
        assert!(matches!(
            load_config_from(vars(&[("CONFORMANCE_MAX_CONCURRENCY", "0")])),
            Err(ApplicationError::Config(_))
        ));
    }
}
