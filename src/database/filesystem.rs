//! # Filesystem Backend
//!
//! Directory-per-namespace, file-per-key under a root directory. Writes go to
//! a hidden temp file first and are renamed into place, so readers never see
//! a partial value. One mutex serialises all operations.

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tokio::sync::Mutex;

use super::backend::{Database, Dataset};
use super::errors::{DbError, DbResult};

/// Local filesystem storage backend
#[derive(Debug)]
pub struct FsDatabase {
    root: PathBuf,
    lock: Mutex<()>,
}

impl FsDatabase {
    /// Create a backend rooted at `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            lock: Mutex::new(()),
        }
    }

    /// Root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn namespace_dir(&self, namespace: &str) -> DbResult<PathBuf> {
        ensure_plain_name(namespace)?;
        Ok(self.root.join(namespace))
    }

    fn item_path(&self, namespace: &str, key: &str) -> DbResult<PathBuf> {
        ensure_plain_name(key)?;
        Ok(self.namespace_dir(namespace)?.join(key))
    }

    async fn require_namespace(&self, namespace: &str) -> DbResult<PathBuf> {
        let dir = self.namespace_dir(namespace)?;
        if fs::metadata(&dir).await.map(|m| m.is_dir()).unwrap_or(false) {
            Ok(dir)
        } else {
            Err(DbError::namespace_not_found(namespace))
        }
    }
}

/// Reject names that would escape the namespace directory
fn ensure_plain_name(name: &str) -> DbResult<()> {
    let plain = !name.is_empty()
        && !name.starts_with('.')
        && !name.contains(['/', '\\', '\0']);
    if plain {
        Ok(())
    } else {
        Err(DbError::internal(format!("invalid storage name '{}'", name)))
    }
}

#[async_trait]
impl Database for FsDatabase {
    async fn init(&self) -> DbResult<()> {
        fs::create_dir_all(&self.root).await.map_err(|e| {
            DbError::internal(format!(
                "cannot create data directory {}: {}",
                self.root.display(),
                e
            ))
        })
    }

    async fn disconnect(&self) {}

    async fn create_namespace(&self, namespace: &str) -> DbResult<()> {
        let _guard = self.lock.lock().await;
        let dir = self.namespace_dir(namespace)?;
        fs::create_dir_all(&dir).await?;
        Ok(())
    }

    async fn upsert(
        &self,
        namespace: &str,
        key: &str,
        value: &[u8],
        allow_overwrite: bool,
    ) -> DbResult<()> {
        let _guard = self.lock.lock().await;
        let dir = self.namespace_dir(namespace)?;
        let path = self.item_path(namespace, key)?;
        fs::create_dir_all(&dir).await?;

        if !allow_overwrite && fs::try_exists(&path).await? {
            return Err(DbError::item_conflict(namespace, key));
        }

        let tmp = dir.join(format!(".{}.tmp", key));
        fs::write(&tmp, value).await?;
        fs::rename(&tmp, &path).await?;
        Ok(())
    }

    async fn get(&self, namespace: &str, key: &str) -> DbResult<Vec<u8>> {
        let _guard = self.lock.lock().await;
        self.require_namespace(namespace).await?;
        let path = self.item_path(namespace, key)?;

        fs::read(&path).await.map_err(|e| {
            if e.kind() == ErrorKind::NotFound {
                DbError::id_not_found(namespace, key)
            } else {
                DbError::from(e)
            }
        })
    }

    async fn get_all(&self, namespace: &str) -> DbResult<Dataset> {
        let _guard = self.lock.lock().await;
        let dir = self.require_namespace(namespace).await?;

        let mut items = HashMap::new();
        let mut entries = fs::read_dir(&dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            if name.starts_with('.') || !entry.file_type().await?.is_file() {
                continue;
            }
            let value = fs::read(entry.path()).await?;
            items.insert(name, value);
        }
        Ok(items)
    }

    async fn delete(&self, namespace: &str, key: &str) -> DbResult<()> {
        let _guard = self.lock.lock().await;
        self.require_namespace(namespace).await?;
        let path = self.item_path(namespace, key)?;

        fs::remove_file(&path).await.map_err(|e| {
            if e.kind() == ErrorKind::NotFound {
                DbError::id_not_found(namespace, key)
            } else {
                DbError::from(e)
            }
        })
    }

    async fn delete_all(&self, namespace: &str) -> DbResult<()> {
        let _guard = self.lock.lock().await;
        let dir = self.require_namespace(namespace).await?;
        fs::remove_dir_all(&dir).await?;
        Ok(())
    }

    async fn list_namespaces(&self) -> Vec<String> {
        let _guard = self.lock.lock().await;
        let mut names = Vec::new();

        let mut entries = match fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!(root = %self.root.display(), error = %e, "cannot list namespaces");
                return names;
            }
        };

        loop {
            match entries.next_entry().await {
                Ok(Some(entry)) => {
                    let is_dir = entry.file_type().await.map(|t| t.is_dir()).unwrap_or(false);
                    if let (true, Some(name)) = (is_dir, entry.file_name().to_str()) {
                        names.push(name.to_string());
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    tracing::warn!(error = %e, "namespace listing interrupted");
                    break;
                }
            }
        }
        names
    }
}
