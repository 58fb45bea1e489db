//! CLI argument definitions using clap
//!
//! Commands:
//! - unirest serve [--config <path>] [flags]
//! - unirest check-config [--config <path>] [flags]
//!
//! Every flag can also come from its environment variable. Flags override
//! the config file, which overrides the built-in defaults.

use std::path::PathBuf;

use clap::builder::BoolishValueParser;
use clap::{Args, Parser, Subcommand};

use super::errors::CliResult;
use crate::database::Driver;
use crate::http_server::ServerConfig;
use crate::observability::LogFormat;

/// unirest - a REST surface over pluggable key-value storage
#[derive(Parser, Debug)]
#[command(name = "unirest")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the REST server (and the broker, if enabled)
    Serve(ServeArgs),

    /// Validate the effective configuration and print it
    CheckConfig(ServeArgs),
}

/// Settings shared by `serve` and `check-config`
#[derive(Args, Debug, Clone, Default)]
pub struct ServeArgs {
    /// JSON config file; flags and environment override its fields
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// ip:port for the REST API
    #[arg(long, env = "IP_PORT")]
    pub addr: Option<String>,

    /// ip:port for the event broker
    #[arg(long, env = "BROKER_IP_PORT")]
    pub broker_addr: Option<String>,

    /// Serve the event broker
    #[arg(long, env = "BROKER_ENABLED", value_parser = BoolishValueParser::new())]
    pub broker_enabled: Option<bool>,

    /// Serve /openapi.json and /swagger.json
    #[arg(long, env = "SWAGGER_ENABLED", value_parser = BoolishValueParser::new())]
    pub swagger_enabled: Option<bool>,

    /// Require an RSA-signed bearer token on every REST call
    #[arg(long, env = "AUTH_ENABLED", value_parser = BoolishValueParser::new())]
    pub auth_enabled: Option<bool>,

    /// PEM public key for token verification
    #[arg(long, env = "AUTH_PUBLIC_KEY")]
    pub auth_public_key: Option<PathBuf>,

    /// Storage driver (memory | fs | sqlite | postgres | mysql | redis | mongo)
    #[arg(long, env = "DB_DRIVER")]
    pub db_driver: Option<Driver>,

    /// Storage path (fs | sqlite)
    #[arg(long, env = "DB_PATH")]
    pub db_path: Option<PathBuf>,

    /// Database host (networked drivers)
    #[arg(long, env = "DB_HOST")]
    pub db_host: Option<String>,

    /// Database name (networked drivers)
    #[arg(long, env = "DB_NAME")]
    pub db_name: Option<String>,

    /// Database user (networked drivers)
    #[arg(long, env = "DB_USER")]
    pub db_user: Option<String>,

    /// Database password (networked drivers)
    #[arg(long, env = "DB_PASS", hide_env_values = true)]
    pub db_pass: Option<String>,

    #[arg(long, env = "LOG_FORMAT", value_enum)]
    pub log_format: Option<LogFormat>,

    /// Level directive, e.g. "info" or "unirest=debug"
    #[arg(long, env = "LOG_LEVEL")]
    pub log_level: Option<String>,
}

impl ServeArgs {
    /// Effective configuration: defaults, then the config file, then flags.
    /// The result is validated.
    pub fn resolve(&self) -> CliResult<ServerConfig> {
        let mut config = match &self.config {
            Some(path) => ServerConfig::load(path)?,
            None => ServerConfig::default(),
        };
        self.apply(&mut config);
        config.validate()?;
        Ok(config)
    }

    fn apply(&self, config: &mut ServerConfig) {
        if let Some(addr) = &self.addr {
            config.addr = addr.clone();
        }
        if let Some(addr) = &self.broker_addr {
            config.broker_addr = addr.clone();
        }
        if let Some(enabled) = self.broker_enabled {
            config.broker_enabled = enabled;
        }
        if let Some(enabled) = self.swagger_enabled {
            config.swagger_enabled = enabled;
        }
        if let Some(enabled) = self.auth_enabled {
            config.auth_enabled = enabled;
        }
        if let Some(path) = &self.auth_public_key {
            config.auth_public_key = path.clone();
        }
        if let Some(format) = self.log_format {
            config.log_format = format;
        }
        if let Some(level) = &self.log_level {
            config.log_level = level.clone();
        }

        let db = &mut config.database;
        if let Some(driver) = self.db_driver {
            db.driver = driver;
        }
        if let Some(path) = &self.db_path {
            db.path = path.clone();
        }
        if let Some(host) = &self.db_host {
            db.host = host.clone();
        }
        if let Some(name) = &self.db_name {
            db.name = name.clone();
        }
        if let Some(user) = &self.db_user {
            db.user = user.clone();
        }
        if let Some(pass) = &self.db_pass {
            db.pass = pass.clone();
        }
    }
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
