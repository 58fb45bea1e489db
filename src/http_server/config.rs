//! HTTP Server Configuration
//!
//! Listener addresses, feature switches, logging and storage settings.
//! Every field has a default so a partial JSON document is a valid config.

use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::database::DatabaseConfig;
use crate::observability::{validate_level, LogFormat};

/// Configuration problems detected before boot
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {message}")]
    Read { path: String, message: String },

    #[error("invalid config JSON: {0}")]
    Parse(String),

    #[error("invalid {field} '{value}': expected host:port")]
    InvalidAddress { field: &'static str, value: String },

    #[error("broker listener cannot share the API address {0}")]
    AddressClash(String),

    #[error("db driver '{0}' is not available in this build (memory | fs | sqlite)")]
    UnsupportedDriver(String),

    #[error("{0}")]
    Logging(String),
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// REST listener (default: "0.0.0.0:8000")
    #[serde(default = "default_addr")]
    pub addr: String,

    /// Serve the event stream (default: false)
    #[serde(default)]
    pub broker_enabled: bool,

    /// Event stream listener (default: "0.0.0.0:8001")
    #[serde(default = "default_broker_addr")]
    pub broker_addr: String,

    /// Serve the generated OpenAPI document (default: false)
    #[serde(default)]
    pub swagger_enabled: bool,

    /// Require a bearer token on every REST call (default: false)
    #[serde(default)]
    pub auth_enabled: bool,

    /// PEM public key verifying bearer tokens
    #[serde(default = "default_public_key")]
    pub auth_public_key: PathBuf,

    #[serde(default)]
    pub log_format: LogFormat,

    /// Level directive, e.g. "info" or "unirest=debug"
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub database: DatabaseConfig,
}

fn default_addr() -> String {
    "0.0.0.0:8000".to_string()
}

fn default_broker_addr() -> String {
    "0.0.0.0:8001".to_string()
}

fn default_public_key() -> PathBuf {
    PathBuf::from("./certs/public-cert.pem")
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: default_addr(),
            broker_enabled: false,
            broker_addr: default_broker_addr(),
            swagger_enabled: false,
            auth_enabled: false,
            auth_public_key: default_public_key(),
            log_format: LogFormat::default(),
            log_level: default_log_level(),
            database: DatabaseConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Load and validate a JSON config file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;

        let config: ServerConfig =
            serde_json::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check everything that can be checked without side effects
    pub fn validate(&self) -> Result<(), ConfigError> {
        let api = self.socket_addr()?;
        if self.broker_enabled {
            let broker = self.broker_socket_addr()?;
            if broker.port() == api.port() {
                return Err(ConfigError::AddressClash(self.addr.clone()));
            }
        }

        if !self.database.driver.is_supported() {
            return Err(ConfigError::UnsupportedDriver(
                self.database.driver.to_string(),
            ));
        }

        validate_level(&self.log_level).map_err(|e| ConfigError::Logging(e.to_string()))?;
        Ok(())
    }

    /// REST listener address
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        parse_addr("addr", &self.addr)
    }

    /// Event stream listener address
    pub fn broker_socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        parse_addr("broker_addr", &self.broker_addr)
    }
}

fn parse_addr(field: &'static str, value: &str) -> Result<SocketAddr, ConfigError> {
    value.parse().map_err(|_| ConfigError::InvalidAddress {
        field,
        value: value.to_string(),
    })
}
