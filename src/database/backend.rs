//! # Storage Contract
//!
//! Operations every backend must implement, with uniform semantics
//! regardless of the underlying engine. Implementations are responsible for
//! their own concurrency discipline; every method may be called from many
//! tasks at once.

use std::collections::HashMap;

use async_trait::async_trait;

use super::errors::DbResult;

/// Items of one namespace, keyed by item key
pub type Dataset = HashMap<String, Vec<u8>>;

/// Backend trait for key-value storage engines
#[async_trait]
pub trait Database: Send + Sync + std::fmt::Debug {
    /// Acquire backend resources. Failure is fatal at startup.
    async fn init(&self) -> DbResult<()>;

    /// Release every held handle. A second call is a no-op.
    async fn disconnect(&self);

    /// Create a namespace. Creating an existing namespace succeeds.
    async fn create_namespace(&self, namespace: &str) -> DbResult<()>;

    /// Write `value` at `key`, creating the namespace when missing.
    ///
    /// Fails with `ItemConflict` when `allow_overwrite` is false and the key
    /// already exists.
    async fn upsert(
        &self,
        namespace: &str,
        key: &str,
        value: &[u8],
        allow_overwrite: bool,
    ) -> DbResult<()>;

    /// Read one item
    async fn get(&self, namespace: &str, key: &str) -> DbResult<Vec<u8>>;

    /// Read every item of a namespace
    async fn get_all(&self, namespace: &str) -> DbResult<Dataset>;

    /// Delete one item
    async fn delete(&self, namespace: &str, key: &str) -> DbResult<()>;

    /// Drop a namespace and every item in it
    async fn delete_all(&self, namespace: &str) -> DbResult<()>;

    /// List namespace names. Never fails.
    async fn list_namespaces(&self) -> Vec<String>;
}
