//! Console settings.
//!
//! Layered with the `config` crate: defaults, then a JSON document, then
//! `OPS_CONSOLE_*` environment variables.

use std::{collections::HashMap, time::Duration};

use config::{Config, ConfigError, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use tracing::Level;

use crate::{
    affected::wizard::DEFAULT_MAX_AFFECTED_ENTITIES,
    error::{ConsoleError, Result},
};

pub const ENV_PREFIX: &str = "OPS_CONSOLE";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsoleConfig {
    pub disruption_api_url: String,
    pub roadworks_api_url: String,
    pub cars_api_url: String,
    pub max_affected_entities: usize,
    pub polling_interval_secs: u64,
    pub cars_cache_expiry_secs: u64,
    pub request_timeout_secs: u64,
    pub log_level: String,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            disruption_api_url: "http://localhost:8080/disruption-management".to_owned(),
            roadworks_api_url: "http://localhost:8080/roadworks".to_owned(),
            cars_api_url: "http://localhost:8080/cars".to_owned(),
            max_affected_entities: DEFAULT_MAX_AFFECTED_ENTITIES,
            polling_interval_secs: 30,
            cars_cache_expiry_secs: 15 * 60,
            request_timeout_secs: 30,
            log_level: "info".to_owned(),
        }
    }
}

impl ConsoleConfig {
    /// Settings from a JSON document, without environment overrides
    pub fn from_json(json: &str) -> Result<Self> {
        Self::load(Some(json), Some(HashMap::new()))
    }

    /// Defaults overridden by the process environment
    pub fn from_env() -> Result<Self> {
        Self::load(None, None)
    }

    /// Layers `json` and then the environment over the defaults.
    ///
    /// `env` replaces the process environment when given.
    pub fn load(json: Option<&str>, env: Option<HashMap<String, String>>) -> Result<Self> {
        let mut builder = Config::builder();
        if let Some(json) = json {
            builder = builder.add_source(File::from_str(json, FileFormat::Json));
        }
        let config: Self = builder
            .add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true).source(env))
            .build()
            .and_then(Config::try_deserialize)
            .map_err(config_error)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        for (name, url) in [
            ("disruption_api_url", &self.disruption_api_url),
            ("roadworks_api_url", &self.roadworks_api_url),
            ("cars_api_url", &self.cars_api_url),
        ] {
            reqwest::Url::parse(url).map_err(|e| ConsoleError::Config(format!("{name}: {e}")))?;
        }
        if self.max_affected_entities == 0 {
            return Err(ConsoleError::Config("max_affected_entities must be positive".into()));
        }
        if self.polling_interval_secs == 0 {
            return Err(ConsoleError::Config("polling_interval_secs must be positive".into()));
        }
        self.log_level()?;
        Ok(())
    }

    pub fn log_level(&self) -> Result<Level> {
        self.log_level
            .parse()
            .map_err(|_| ConsoleError::Config(format!("unknown log level {:?}", self.log_level)))
    }

    pub fn polling_interval(&self) -> Duration {
        Duration::from_secs(self.polling_interval_secs)
    }

    pub fn cars_cache_expiry(&self) -> Duration {
        Duration::from_secs(self.cars_cache_expiry_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn config_error(e: ConfigError) -> ConsoleError {
    ConsoleError::Config(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ConsoleConfig::default();
        assert_eq!(config.max_affected_entities, 200);
        assert_eq!(config.polling_interval(), Duration::from_secs(30));
        assert_eq!(config.cars_cache_expiry(), Duration::from_secs(900));
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
        assert_eq!(config.log_level().unwrap(), Level::INFO);
        assert!(config.validate().is_ok());
    }

    fn env(vars: &[(&str, &str)]) -> Option<HashMap<String, String>> {
        Some(vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect())
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = ConsoleConfig::from_json(r#"{"polling_interval_secs": 10, "log_level": "debug"}"#).unwrap();
        assert_eq!(config.polling_interval_secs, 10);
        assert_eq!(config.log_level().unwrap(), Level::DEBUG);
        assert_eq!(config.max_affected_entities, 200);
    }

    #[test]
    fn test_env_overrides() {
        let config = ConsoleConfig::load(
            Some(r#"{"max_affected_entities": 120, "polling_interval_secs": 10}"#),
            env(&[
                ("OPS_CONSOLE_MAX_AFFECTED_ENTITIES", "50"),
                ("OPS_CONSOLE_CARS_API_URL", "https://cars.example.org/api"),
            ]),
        )
        .unwrap();
        assert_eq!(config.max_affected_entities, 50);
        assert_eq!(config.polling_interval_secs, 10);
        assert_eq!(config.cars_api_url, "https://cars.example.org/api");
    }

    #[test]
    fn test_bad_override_is_rejected() {
        let err = ConsoleConfig::load(None, env(&[("OPS_CONSOLE_POLLING_INTERVAL_SECS", "soon")])).unwrap_err();
        assert!(matches!(err, ConsoleError::Config(_)));
    }

    #[test]
    fn test_bad_json_is_rejected() {
        let err = ConsoleConfig::from_json("{ not json").unwrap_err();
        assert!(matches!(err, ConsoleError::Config(_)));

        let err = ConsoleConfig::from_json(r#"{"log_level": "loud"}"#).unwrap_err();
        assert!(matches!(err, ConsoleError::Config(_)));
    }

    #[test]
    fn test_validation() {
        let config = ConsoleConfig {
            disruption_api_url: "not a url".into(),
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = ConsoleConfig {
            max_affected_entities: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
