//! Engine configuration: typed settings with layered precedence (defaults →
//! file → environment).

use std::path::Path;

use config::{Config, Environment, File};
use serde::Deserialize;

use crate::error::EngineError;

const LOCAL_CONFIG_BASENAME: &str = "raffica";
const ENV_PREFIX: &str = "RAFFICA";

const DEFAULT_HEADER_NAME: &str = "Surrogate-Key";
const DEFAULT_PURGE_ENDPOINT: &str = "http://127.0.0.1:8080/purge";
const DEFAULT_GATEWAY_TIMEOUT_MS: u64 = 2_000;
const DEFAULT_LOG_LEVEL: &str = "info";

/// Response-tagging settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EmitterSettings {
    /// Header carrying the key set on outgoing responses.
    pub header_name: String,
    pub enabled: bool,
}

impl Default for EmitterSettings {
    fn default() -> Self {
        Self {
            header_name: DEFAULT_HEADER_NAME.to_string(),
            enabled: true,
        }
    }
}

/// Edge-purge transport settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GatewaySettings {
    /// Edge-purge endpoint receiving the key set.
    pub endpoint: String,
    /// Optional bearer token for the purge endpoint.
    pub auth_token: Option<String>,
    /// Per-request timeout; an expired purge is reported, never retried.
    pub timeout_ms: u64,
}

impl Default for GatewaySettings {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_PURGE_ENDPOINT.to_string(),
            auth_token: None,
            timeout_ms: DEFAULT_GATEWAY_TIMEOUT_MS,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Base log level (trace|debug|info|warn|error).
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: DEFAULT_LOG_LEVEL.to_string(),
            format: LogFormat::Compact,
        }
    }
}

/// Root engine configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub emitter: EmitterSettings,
    pub gateway: GatewaySettings,
    pub logging: LoggingSettings,
}

impl EngineConfig {
    /// Load configuration with layered precedence: built-in defaults, then
    /// an optional TOML file (`raffica.toml` by default), then `RAFFICA_*`
    /// environment variables (`RAFFICA_GATEWAY__ENDPOINT=…`).
    pub fn load(path: Option<&Path>) -> Result<Self, EngineError> {
        let mut builder = Config::builder();
        builder = match path {
            Some(path) => builder.add_source(File::from(path).required(true)),
            None => builder.add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false)),
        };
        builder = builder.add_source(Environment::with_prefix(ENV_PREFIX).separator("__"));

        builder
            .build()
            .and_then(Config::try_deserialize)
            .map_err(|err| EngineError::configuration(err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_values() {
        let config = EngineConfig::default();
        assert!(config.emitter.enabled);
        assert_eq!(config.emitter.header_name, "Surrogate-Key");
        assert_eq!(config.gateway.endpoint, "http://127.0.0.1:8080/purge");
        assert_eq!(config.gateway.timeout_ms, 2_000);
        assert!(config.gateway.auth_token.is_none());
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.format, LogFormat::Compact);
    }

    #[test]
    fn load_without_file_uses_defaults() {
        let config = EngineConfig::load(None).expect("defaults should load");
        assert_eq!(config.emitter.header_name, "Surrogate-Key");
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let err = EngineConfig::load(Some(Path::new("/nonexistent/raffica.toml"))).unwrap_err();
        assert!(matches!(err, EngineError::Configuration { .. }));
    }
}
