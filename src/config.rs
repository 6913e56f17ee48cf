use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{JsondsError, Result};

/// Environment variable naming the TOML configuration file.
pub const CONFIG_ENV: &str = "JSONDS_CONFIG";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub name: String,
    #[serde(alias = "loglevel")]
    pub log_level: String,
    pub http: HttpConfig,
    /// Endpoint name (`search`, `tag-keys`, ...) to path overrides.
    pub endpoints: BTreeMap<String, String>,
    pub demo: DemoConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            name: "jsonds".to_string(),
            log_level: "info".to_string(),
            http: HttpConfig::default(),
            endpoints: BTreeMap::new(),
            demo: DemoConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub address: String,
    pub metrics_path: Option<String>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            address: "0.0.0.0:8080".to_string(),
            metrics_path: None,
        }
    }
}

/// Settings for the sample backend shipped with the binary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DemoConfig {
    pub targets: Vec<String>,
    pub value: f64,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            targets: vec!["upper_25".into(), "upper_50".into(), "upper_75".into()],
            value: 1.0,
        }
    }
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| {
            JsondsError::Config(format!("Unable to read {}: {}", path.display(), e))
        })?;
        contents.parse()
    }

    /// Loads the file named by `JSONDS_CONFIG`, or the defaults when unset.
    pub fn from_env() -> Result<Self> {
        match std::env::var(CONFIG_ENV) {
            Ok(path) => Self::load(path),
            Err(_) => Ok(Self::default()),
        }
    }
}

impl FromStr for Config {
    type Err = JsondsError;

    fn from_str(s: &str) -> Result<Self> {
        Ok(toml::from_str(s)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config: Config = "".parse().unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.http.address, "0.0.0.0:8080");
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn test_full_file() {
        let config: Config = r#"
            name = "edge"
            log_level = "debug"

            [http]
            address = "127.0.0.1:9000"
            metrics_path = "/metrics"

            [endpoints]
            search = "/find"
            tag-keys = "/keys"

            [demo]
            targets = ["a"]
        "#
        .parse()
        .unwrap();
        assert_eq!(config.name, "edge");
        assert_eq!(config.http.metrics_path.as_deref(), Some("/metrics"));
        assert_eq!(config.endpoints["tag-keys"], "/keys");
        assert_eq!(config.demo.targets, vec!["a"]);
        assert_eq!(config.demo.value, 1.0);
    }

    #[test]
    fn test_loglevel_spelling_is_accepted() {
        let config: Config = "loglevel = \"debug\"".parse().unwrap();
        assert_eq!(config.log_level, "debug");

        let config: Config = "log_level = \"warn\"".parse().unwrap();
        assert_eq!(config.log_level, "warn");
    }

    #[test]
    fn test_bad_file_is_config_error() {
        let err = "http = 3".parse::<Config>().unwrap_err();
        assert!(matches!(err, JsondsError::Config(_)));
        assert!(matches!(
            Config::load("/nonexistent/jsonds.toml"),
            Err(JsondsError::Config(_))
        ));
    }
}
