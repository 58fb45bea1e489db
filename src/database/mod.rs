//! # Storage Layer
//!
//! The `Database` contract and the backends shipped with unirest.
//!
//! - `memory`: single-mutex hashmap (reference/dev backend)
//! - `fs`: directory-per-namespace on local disk
//! - `sqlite`: namespace and item tables in an embedded database file
//!
//! Networked engines are further implementations of the same trait.

pub mod backend;
pub mod config;
pub mod errors;
pub mod filesystem;
pub mod memory;
pub mod sqlite;

pub use backend::{Database, Dataset};
pub use config::{DatabaseConfig, Driver};
pub use errors::{DbError, DbErrorKind, DbResult};
pub use filesystem::FsDatabase;
pub use memory::MemoryDatabase;
pub use sqlite::SqliteDatabase;
