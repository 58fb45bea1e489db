//! # In-Memory Backend
//!
//! Every namespace and item map sits behind one mutex which each operation
//! holds for its whole duration. Writes are linearizable; throughput is
//! bounded by the single lock.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::backend::{Database, Dataset};
use super::errors::{DbError, DbResult};

/// Hashmap-on-RAM storage backend
#[derive(Debug, Default)]
pub struct MemoryDatabase {
    namespaces: Mutex<HashMap<String, Dataset>>,
}

impl MemoryDatabase {
    /// Create an empty in-memory database
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Database for MemoryDatabase {
    async fn init(&self) -> DbResult<()> {
        self.namespaces.lock().await.clear();
        Ok(())
    }

    async fn disconnect(&self) {}

    async fn create_namespace(&self, namespace: &str) -> DbResult<()> {
        let mut namespaces = self.namespaces.lock().await;
        namespaces.entry(namespace.to_string()).or_default();
        Ok(())
    }

    async fn upsert(
        &self,
        namespace: &str,
        key: &str,
        value: &[u8],
        allow_overwrite: bool,
    ) -> DbResult<()> {
        let mut namespaces = self.namespaces.lock().await;
        let data = namespaces.entry(namespace.to_string()).or_default();

        if !allow_overwrite && data.contains_key(key) {
            return Err(DbError::item_conflict(namespace, key));
        }

        data.insert(key.to_string(), value.to_vec());
        Ok(())
    }

    async fn get(&self, namespace: &str, key: &str) -> DbResult<Vec<u8>> {
        let namespaces = self.namespaces.lock().await;
        let data = namespaces
            .get(namespace)
            .ok_or_else(|| DbError::namespace_not_found(namespace))?;

        data.get(key)
            .cloned()
            .ok_or_else(|| DbError::id_not_found(namespace, key))
    }

    async fn get_all(&self, namespace: &str) -> DbResult<Dataset> {
        let namespaces = self.namespaces.lock().await;
        namespaces
            .get(namespace)
            .cloned()
            .ok_or_else(|| DbError::namespace_not_found(namespace))
    }

    async fn delete(&self, namespace: &str, key: &str) -> DbResult<()> {
        let mut namespaces = self.namespaces.lock().await;
        let data = namespaces
            .get_mut(namespace)
            .ok_or_else(|| DbError::namespace_not_found(namespace))?;

        data.remove(key)
            .map(|_| ())
            .ok_or_else(|| DbError::id_not_found(namespace, key))
    }

    async fn delete_all(&self, namespace: &str) -> DbResult<()> {
        let mut namespaces = self.namespaces.lock().await;
        namespaces
            .remove(namespace)
            .map(|_| ())
            .ok_or_else(|| DbError::namespace_not_found(namespace))
    }

    async fn list_namespaces(&self) -> Vec<String> {
        self.namespaces.lock().await.keys().cloned().collect()
    }
}
