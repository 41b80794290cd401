//! Configuration for the demo server

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;

/// Demo-server configuration, loadable from a TOML file with every field
/// optional.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Address to listen on
    #[serde(default = "default_listen_addr")]
    pub listen_addr: SocketAddr,

    /// Location string reported by `GET /{bucket}?location`
    #[serde(default = "default_location")]
    pub location: String,

    /// Access key for signature verification. When both credentials are
    /// set, every request must carry a valid V2 or V4 signature; when
    /// unset, requests pass unauthenticated.
    #[serde(default)]
    pub access_key_id: Option<String>,

    /// Secret key paired with `access_key_id`.
    #[serde(default)]
    pub secret_access_key: Option<String>,

    /// Log level filter string. Overridden by RUST_LOG.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            location: default_location(),
            access_key_id: None,
            secret_access_key: None,
            log_level: default_log_level(),
        }
    }
}

impl Config {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, Box<dyn std::error::Error>> {
        let raw = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&raw)?)
    }

    /// The configured credential pair, when both halves are present.
    pub fn credentials(&self) -> Option<(String, String)> {
        match (&self.access_key_id, &self.secret_access_key) {
            (Some(access_key), Some(secret_key)) => {
                Some((access_key.clone(), secret_key.clone()))
            }
            _ => None,
        }
    }
}

fn default_listen_addr() -> SocketAddr {
    "0.0.0.0:9000".parse().expect("static default address")
}

fn default_location() -> String {
    "us-east-1".to_string()
}

fn default_log_level() -> String {
    "sandbar=debug,tower_http=debug".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.listen_addr, default_listen_addr());
        assert_eq!(config.location, "us-east-1");
        assert!(config.credentials().is_none());
    }

    #[test]
    fn credentials_require_both_halves() {
        let config: Config = toml::from_str("access_key_id = \"AKID\"").unwrap();
        assert!(config.credentials().is_none());

        let config: Config =
            toml::from_str("access_key_id = \"AKID\"\nsecret_access_key = \"secret\"").unwrap();
        assert_eq!(
            config.credentials(),
            Some(("AKID".to_string(), "secret".to_string()))
        );
    }
}
