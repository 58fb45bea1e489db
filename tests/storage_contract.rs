//! Storage Contract Tests
//!
//! Every shipped backend passes the same behavioural checks, and the
//! on-disk backends keep their data across restarts.

mod common;

use std::sync::Arc;

use tempfile::TempDir;
use unirest::database::{
    Database, DatabaseConfig, DbErrorKind, Driver, FsDatabase, MemoryDatabase,
    SqliteDatabase,
};

// =============================================================================
// Contract
// =============================================================================

#[tokio::test]
async fn test_memory_backend_contract() {
    let db = MemoryDatabase::new();
    db.init().await.unwrap();
    common::run_all(&db).await;
}

#[tokio::test]
async fn test_fs_backend_contract() {
    let tmp = TempDir::new().unwrap();
    let db = FsDatabase::new(tmp.path().join("data"));
    db.init().await.unwrap();
    common::run_all(&db).await;
}

#[tokio::test]
async fn test_sqlite_backend_contract() {
    let tmp = TempDir::new().unwrap();
    let db = SqliteDatabase::new(tmp.path());
    db.init().await.unwrap();
    common::run_all(&db).await;
    db.disconnect().await;
}

// =============================================================================
// Persistence
// =============================================================================

async fn reopen_keeps_data(build: impl Fn() -> Arc<dyn Database>) {
    let first = build();
    first.init().await.unwrap();
    first.upsert("users", "u1", br#"{"name":"ada"}"#, false).await.unwrap();
    first.disconnect().await;

    let second = build();
    second.init().await.unwrap();
    assert_eq!(
        second.get("users", "u1").await.unwrap(),
        br#"{"name":"ada"}"#.to_vec()
    );
    assert!(second.list_namespaces().await.contains(&"users".to_string()));
    second.disconnect().await;
}

#[tokio::test]
async fn test_fs_backend_persists() {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();
    reopen_keeps_data(|| Arc::new(FsDatabase::new(root.clone())) as Arc<dyn Database>).await;
}

#[tokio::test]
async fn test_sqlite_backend_persists() {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();
    reopen_keeps_data(|| Arc::new(SqliteDatabase::new(root.clone())) as Arc<dyn Database>).await;
}

// =============================================================================
// Driver selection
// =============================================================================

#[tokio::test]
async fn test_config_builds_supported_drivers() {
    let tmp = TempDir::new().unwrap();
    for driver in [Driver::Memory, Driver::Fs, Driver::Sqlite] {
        let config = DatabaseConfig {
            driver,
            path: tmp.path().join(driver.as_str()),
            ..Default::default()
        };
        let db = config.build().unwrap();
        db.init().await.unwrap();
        db.upsert("ns", "k", b"1", true).await.unwrap();
        assert_eq!(db.get("ns", "k").await.unwrap(), b"1".to_vec());
        db.disconnect().await;
    }
}

#[test]
fn test_config_rejects_networked_drivers() {
    for driver in [Driver::Postgres, Driver::Mysql, Driver::Redis, Driver::Mongo] {
        let config = DatabaseConfig {
            driver,
            ..Default::default()
        };
        let err = config.build().unwrap_err();
        assert_eq!(err.kind(), DbErrorKind::Internal);
    }
}
