//! # Storage Contract Conformance
//!
//! Behavioural checks every `Database` implementation must pass, run
//! against a freshly initialised instance.

use unirest::database::{Database, DbErrorKind};

/// Run every contract check against `db`
pub async fn run_all(db: &dyn Database) {
    create_only_conflicts(db).await;
    overwrite_is_visible(db).await;
    delete_removes_key(db).await;
    delete_all_drops_namespace(db).await;
    missing_namespace_errors(db).await;
    create_namespace_is_idempotent(db).await;
    empty_namespace_lists_empty(db).await;
    list_namespaces_reports_writes(db).await;
    namespaces_are_case_sensitive(db).await;
}

/// Second create-only write conflicts and leaves the first value in place
pub async fn create_only_conflicts(db: &dyn Database) {
    db.upsert("conflict-ns", "k1", b"{\"v\":1}", false)
        .await
        .expect("first create-only write");

    let err = db
        .upsert("conflict-ns", "k1", b"{\"v\":2}", false)
        .await
        .expect_err("second create-only write must conflict");
    assert_eq!(err.kind(), DbErrorKind::ItemConflict);

    let stored = db.get("conflict-ns", "k1").await.expect("get after conflict");
    assert_eq!(stored, b"{\"v\":1}");
}

/// Overwriting upsert is visible to the next read
pub async fn overwrite_is_visible(db: &dyn Database) {
    db.upsert("visible-ns", "k1", b"{\"v\":1}", true)
        .await
        .expect("first write");
    db.upsert("visible-ns", "k1", b"{\"v\":2}", true)
        .await
        .expect("overwrite");

    let stored = db.get("visible-ns", "k1").await.expect("get");
    assert_eq!(stored, b"{\"v\":2}");
}

/// Delete removes exactly the key
pub async fn delete_removes_key(db: &dyn Database) {
    db.upsert("delete-ns", "a", b"1", true).await.expect("write a");
    db.upsert("delete-ns", "b", b"2", true).await.expect("write b");
    db.get("delete-ns", "a").await.expect("get before delete");

    db.delete("delete-ns", "a").await.expect("delete");

    let err = db.get("delete-ns", "a").await.expect_err("deleted key");
    assert_eq!(err.kind(), DbErrorKind::IdNotFound);

    let err = db.delete("delete-ns", "a").await.expect_err("double delete");
    assert_eq!(err.kind(), DbErrorKind::IdNotFound);

    assert_eq!(db.get("delete-ns", "b").await.expect("sibling"), b"2");
}

/// Drop removes every key, then the namespace is gone
pub async fn delete_all_drops_namespace(db: &dyn Database) {
    db.upsert("drop-ns", "a", b"1", true).await.expect("write a");
    db.upsert("drop-ns", "b", b"2", true).await.expect("write b");

    db.delete_all("drop-ns").await.expect("drop");

    let err = db.get_all("drop-ns").await.expect_err("dropped namespace");
    assert_eq!(err.kind(), DbErrorKind::NamespaceNotFound);

    let err = db.delete_all("drop-ns").await.expect_err("second drop");
    assert_eq!(err.kind(), DbErrorKind::NamespaceNotFound);
}

/// Reads against a namespace that never existed
pub async fn missing_namespace_errors(db: &dyn Database) {
    let err = db.get("ghost-ns", "k").await.expect_err("get");
    assert_eq!(err.kind(), DbErrorKind::NamespaceNotFound);

    let err = db.get_all("ghost-ns").await.expect_err("get_all");
    assert_eq!(err.kind(), DbErrorKind::NamespaceNotFound);

    let err = db.delete("ghost-ns", "k").await.expect_err("delete");
    assert_eq!(err.kind(), DbErrorKind::NamespaceNotFound);
}

/// Explicit creation twice is fine and keeps items
pub async fn create_namespace_is_idempotent(db: &dyn Database) {
    db.create_namespace("explicit-ns").await.expect("create");
    db.upsert("explicit-ns", "k", b"1", true).await.expect("write");
    db.create_namespace("explicit-ns").await.expect("create again");

    assert_eq!(db.get("explicit-ns", "k").await.expect("get"), b"1");
}

/// Existing-but-empty namespace lists as an empty map, and can be dropped once
pub async fn empty_namespace_lists_empty(db: &dyn Database) {
    db.create_namespace("empty-ns").await.expect("create");

    let items = db.get_all("empty-ns").await.expect("get_all");
    assert!(items.is_empty());

    db.delete_all("empty-ns").await.expect("drop empty");
    let err = db.delete_all("empty-ns").await.expect_err("drop again");
    assert_eq!(err.kind(), DbErrorKind::NamespaceNotFound);
}

/// Namespaces created by writes appear in the listing
pub async fn list_namespaces_reports_writes(db: &dyn Database) {
    db.upsert("listed-ns", "k", b"1", true).await.expect("write");

    let names = db.list_namespaces().await;
    assert!(names.iter().any(|n| n == "listed-ns"));
    assert!(!names.iter().any(|n| n == "drop-ns"));
}

/// Names differing only in case are separate namespaces
pub async fn namespaces_are_case_sensitive(db: &dyn Database) {
    db.upsert("users", "a", b"1", true).await.expect("write users");
    db.upsert("Users", "k", b"2", true).await.expect("write Users");

    assert_eq!(db.get("Users", "k").await.expect("get Users"), b"2");
    let err = db.get("users", "k").await.expect_err("key only in Users");
    assert_eq!(err.kind(), DbErrorKind::IdNotFound);

    let lower = db.get_all("users").await.expect("get_all users");
    assert_eq!(lower.len(), 1);
    assert!(lower.contains_key("a"));

    let names = db.list_namespaces().await;
    assert!(names.iter().any(|n| n == "users"));
    assert!(names.iter().any(|n| n == "Users"));
}
