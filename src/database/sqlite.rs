//! # SQLite Backend
//!
//! Two tables in a single database file: `namespaces (name)` and
//! `items (ns, id, data)` keyed on `(ns, id)`. Names are compared with the
//! default BINARY collation, so `users` and `Users` are distinct. The
//! connection lives behind a mutex and every call runs on the blocking
//! thread pool.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};

use super::backend::{Database, Dataset};
use super::errors::{DbError, DbResult};

const DEFAULT_FILE_NAME: &str = "unirest.db";

/// Embedded SQL storage backend
#[derive(Debug)]
pub struct SqliteDatabase {
    path: PathBuf,
    conn: Arc<Mutex<Option<Connection>>>,
}

impl SqliteDatabase {
    /// Create a backend for the database file at `path`.
    ///
    /// A path without an extension is treated as a directory holding
    /// `unirest.db`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let path = if path.extension().is_none() && path.as_os_str() != ":memory:" {
            path.join(DEFAULT_FILE_NAME)
        } else {
            path
        };
        Self {
            path,
            conn: Arc::new(Mutex::new(None)),
        }
    }

    /// Private in-memory database, mostly useful for tests
    pub fn in_memory() -> Self {
        Self::new(":memory:")
    }

    /// Database file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn with_conn<T, F>(&self, f: F) -> DbResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> DbResult<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let guard = conn
                .lock()
                .map_err(|_| DbError::internal("sqlite connection lock poisoned"))?;
            let conn = guard
                .as_ref()
                .ok_or_else(|| DbError::internal("sqlite database is not connected"))?;
            f(conn)
        })
        .await
        .map_err(|e| DbError::internal(format!("sqlite task failed: {}", e)))?
    }
}

const CREATE_TABLES: &str = "\
    CREATE TABLE IF NOT EXISTS namespaces (name TEXT PRIMARY KEY NOT NULL);
    CREATE TABLE IF NOT EXISTS items (
        ns TEXT NOT NULL REFERENCES namespaces (name) ON DELETE CASCADE,
        id TEXT NOT NULL,
        data BLOB NOT NULL,
        PRIMARY KEY (ns, id)
    );";

fn namespace_exists(conn: &Connection, namespace: &str) -> DbResult<bool> {
    let found = conn
        .query_row(
            "SELECT 1 FROM namespaces WHERE name = ?1",
            params![namespace],
            |_| Ok(()),
        )
        .optional()?;
    Ok(found.is_some())
}

fn ensure_namespace(conn: &Connection, namespace: &str) -> DbResult<()> {
    conn.execute(
        "INSERT OR IGNORE INTO namespaces (name) VALUES (?1)",
        params![namespace],
    )?;
    Ok(())
}

fn require_namespace(conn: &Connection, namespace: &str) -> DbResult<()> {
    if namespace_exists(conn, namespace)? {
        Ok(())
    } else {
        Err(DbError::namespace_not_found(namespace))
    }
}

#[async_trait]
impl Database for SqliteDatabase {
    async fn init(&self) -> DbResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let path = self.path.clone();
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let opened = Connection::open(&path)?;
            opened.execute_batch("PRAGMA foreign_keys = ON;")?;
            opened.execute_batch(CREATE_TABLES)?;
            let mut guard = conn
                .lock()
                .map_err(|_| DbError::internal("sqlite connection lock poisoned"))?;
            *guard = Some(opened);
            Ok::<_, DbError>(())
        })
        .await
        .map_err(|e| DbError::internal(format!("sqlite task failed: {}", e)))??;

        tracing::info!(path = %self.path.display(), "sqlite database opened");
        Ok(())
    }

    async fn disconnect(&self) {
        let closed = match self.conn.lock() {
            Ok(mut guard) => guard.take(),
            Err(_) => None,
        };
        if let Some(conn) = closed {
            if let Err((_, e)) = conn.close() {
                tracing::error!(error = %e, "sqlite close failed");
            } else {
                tracing::info!("sqlite database closed");
            }
        }
    }

    async fn create_namespace(&self, namespace: &str) -> DbResult<()> {
        let namespace = namespace.to_string();
        self.with_conn(move |conn| ensure_namespace(conn, &namespace)).await
    }

    async fn upsert(
        &self,
        namespace: &str,
        key: &str,
        value: &[u8],
        allow_overwrite: bool,
    ) -> DbResult<()> {
        let namespace = namespace.to_string();
        let key = key.to_string();
        let value = value.to_vec();

        self.with_conn(move |conn| {
            ensure_namespace(conn, &namespace)?;
            if allow_overwrite {
                conn.execute(
                    "INSERT INTO items (ns, id, data) VALUES (?1, ?2, ?3) \
                     ON CONFLICT (ns, id) DO UPDATE SET data = excluded.data",
                    params![namespace, key, value],
                )?;
                return Ok(());
            }

            let inserted = conn.execute(
                "INSERT OR IGNORE INTO items (ns, id, data) VALUES (?1, ?2, ?3)",
                params![namespace, key, value],
            )?;
            if inserted == 0 {
                return Err(DbError::item_conflict(&namespace, &key));
            }
            Ok(())
        })
        .await
    }

    async fn get(&self, namespace: &str, key: &str) -> DbResult<Vec<u8>> {
        let namespace = namespace.to_string();
        let key = key.to_string();

        self.with_conn(move |conn| {
            require_namespace(conn, &namespace)?;
            conn.query_row(
                "SELECT data FROM items WHERE ns = ?1 AND id = ?2",
                params![namespace, key],
                |row| row.get::<_, Vec<u8>>(0),
            )
            .optional()?
            .ok_or_else(|| DbError::id_not_found(&namespace, &key))
        })
        .await
    }

    async fn get_all(&self, namespace: &str) -> DbResult<Dataset> {
        let namespace = namespace.to_string();

        self.with_conn(move |conn| {
            require_namespace(conn, &namespace)?;
            let mut stmt = conn.prepare("SELECT id, data FROM items WHERE ns = ?1 ORDER BY id")?;
            let rows = stmt.query_map(params![namespace], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, Vec<u8>>(1)?))
            })?;

            let mut items = HashMap::new();
            for row in rows {
                let (id, data) = row?;
                items.insert(id, data);
            }
            Ok(items)
        })
        .await
    }

    async fn delete(&self, namespace: &str, key: &str) -> DbResult<()> {
        let namespace = namespace.to_string();
        let key = key.to_string();

        self.with_conn(move |conn| {
            require_namespace(conn, &namespace)?;
            let deleted = conn.execute(
                "DELETE FROM items WHERE ns = ?1 AND id = ?2",
                params![namespace, key],
            )?;
            if deleted == 0 {
                return Err(DbError::id_not_found(&namespace, &key));
            }
            Ok(())
        })
        .await
    }

    async fn delete_all(&self, namespace: &str) -> DbResult<()> {
        let namespace = namespace.to_string();

        self.with_conn(move |conn| {
            require_namespace(conn, &namespace)?;
            conn.execute("DELETE FROM items WHERE ns = ?1", params![namespace])?;
            conn.execute("DELETE FROM namespaces WHERE name = ?1", params![namespace])?;
            Ok(())
        })
        .await
    }

    async fn list_namespaces(&self) -> Vec<String> {
        let listed = self
            .with_conn(|conn| {
                let mut stmt = conn.prepare("SELECT name FROM namespaces ORDER BY name")?;
                let names = stmt
                    .query_map([], |row| row.get::<_, String>(0))?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(names)
            })
            .await;

        listed.unwrap_or_else(|e| {
            tracing::warn!(error = %e, "cannot list namespaces");
            Vec::new()
        })
    }
}
