//! # Configuration
//!
//! Purpose: load the plain `key=value` configuration file format the
//! original framework's providers and gateways read at startup (see
//! `original_source/rpcserver/src/rpc/rpcapplication.cc`'s `MprcConfig`),
//! preserving its line grammar exactly: `#` starts a comment, surrounding
//! whitespace is trimmed, blank lines are skipped, and the `services` key
//! may repeat to build a publish allow-list while every other key
//! overwrites on repeat.

use std::collections::HashMap;
use std::path::Path;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read { path: String, source: std::io::Error },
    #[error("missing required config key: {0}")]
    MissingKey(String),
    #[error("invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },
}

/// Parsed `key=value` configuration, plus the repeated-`services` allow-list.
#[derive(Debug, Default, Clone)]
pub struct AppConfig {
    values: HashMap<String, String>,
    pub services: Vec<String>,
}

impl AppConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path_ref = path.as_ref();
        let text = std::fs::read_to_string(path_ref).map_err(|source| ConfigError::Read {
            path: path_ref.display().to_string(),
            source,
        })?;
        Ok(Self::parse(&text))
    }

    pub fn parse(text: &str) -> Self {
        let mut config = AppConfig::default();
        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            let key = key.trim();
            let value = value.trim();
            if key == "services" {
                config.services.push(value.to_string());
            } else {
                config.values.insert(key.to_string(), value.to_string());
            }
        }
        config
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn require(&self, key: &str) -> Result<&str, ConfigError> {
        self.get(key).ok_or_else(|| ConfigError::MissingKey(key.to_string()))
    }

    pub fn require_port(&self, key: &str) -> Result<u16, ConfigError> {
        let raw = self.require(key)?;
        raw.parse().map_err(|_| ConfigError::InvalidValue {
            key: key.to_string(),
            value: raw.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_repeated_services_and_flat_keys() {
        let text = "\
            # provider config\n\
            rpcserverip=127.0.0.1\n\
            rpcserverport = 9000\n\
            services=UserService\n\
            \n\
            services = OrderService\n\
            zookeeperip=127.0.0.1\n\
        ";
        let config = AppConfig::parse(text);
        assert_eq!(config.services, vec!["UserService", "OrderService"]);
        assert_eq!(config.get("rpcserverip"), Some("127.0.0.1"));
        assert_eq!(config.require_port("rpcserverport").unwrap(), 9000);
        assert_eq!(config.get("zookeeperip"), Some("127.0.0.1"));
    }

    #[test]
    fn non_services_keys_overwrite_on_repeat() {
        let text = "rpcserverip=10.0.0.1\nrpcserverip=10.0.0.2\n";
        let config = AppConfig::parse(text);
        assert_eq!(config.get("rpcserverip"), Some("10.0.0.2"));
    }

    #[test]
    fn missing_key_is_reported() {
        let config = AppConfig::parse("");
        assert!(matches!(config.require("rpcserverip"), Err(ConfigError::MissingKey(_))));
    }

    #[test]
    fn ignores_comments_blank_lines_and_whitespace() {
        let text = "  \n# just a comment\n   services=A   \n";
        let config = AppConfig::parse(text);
        assert_eq!(config.services, vec!["A"]);
    }
}
