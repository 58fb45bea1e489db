//! Backend selection and connection settings

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::backend::Database;
use super::errors::{DbError, DbResult};
use super::filesystem::FsDatabase;
use super::memory::MemoryDatabase;
use super::sqlite::SqliteDatabase;

/// Storage engine driver
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Driver {
    /// Hashmap on RAM
    Memory,
    /// Directory-per-namespace on local disk
    Fs,
    /// Embedded SQL database file
    Sqlite,
    Postgres,
    Mysql,
    Redis,
    Mongo,
}

impl Driver {
    pub fn as_str(&self) -> &'static str {
        match self {
            Driver::Memory => "memory",
            Driver::Fs => "fs",
            Driver::Sqlite => "sqlite",
            Driver::Postgres => "postgres",
            Driver::Mysql => "mysql",
            Driver::Redis => "redis",
            Driver::Mongo => "mongo",
        }
    }

    /// Whether this build ships an adapter for the driver
    pub fn is_supported(&self) -> bool {
        matches!(self, Driver::Memory | Driver::Fs | Driver::Sqlite)
    }
}

impl fmt::Display for Driver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Driver {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "memory" => Ok(Driver::Memory),
            "fs" => Ok(Driver::Fs),
            "sqlite" => Ok(Driver::Sqlite),
            "postgres" => Ok(Driver::Postgres),
            "mysql" => Ok(Driver::Mysql),
            "redis" => Ok(Driver::Redis),
            "mongo" => Ok(Driver::Mongo),
            other => Err(format!(
                "invalid db driver '{}' (memory | fs | sqlite | postgres | mysql | redis | mongo)",
                other
            )),
        }
    }
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Driver to use (default: memory)
    #[serde(default = "default_driver")]
    pub driver: Driver,

    /// Storage path for fs | sqlite (default: ./data)
    #[serde(default = "default_path")]
    pub path: PathBuf,

    /// Host for networked drivers
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub user: String,

    #[serde(default, skip_serializing)]
    pub pass: String,
}

fn default_driver() -> Driver {
    Driver::Memory
}

fn default_path() -> PathBuf {
    PathBuf::from("./data")
}

fn default_host() -> String {
    "localhost".to_string()
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            driver: default_driver(),
            path: default_path(),
            host: default_host(),
            name: String::new(),
            user: String::new(),
            pass: String::new(),
        }
    }
}

impl DatabaseConfig {
    /// Build the configured backend. Does not call `init`.
    pub fn build(&self) -> DbResult<Arc<dyn Database>> {
        match self.driver {
            Driver::Memory => Ok(Arc::new(MemoryDatabase::new())),
            Driver::Fs => Ok(Arc::new(FsDatabase::new(self.path.clone()))),
            Driver::Sqlite => Ok(Arc::new(SqliteDatabase::new(self.path.clone()))),
            other => Err(DbError::internal(format!(
                "driver '{}' is not available in this build",
                other
            ))),
        }
    }
}
