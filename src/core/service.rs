//! # Data Service
//!
//! Every REST operation funnels through here. Mutations run
//! validate → storage call → publish, and publish exactly one event on
//! success. A failed step returns its error immediately and nothing is
//! published.

use std::sync::{Arc, OnceLock};

use regex::Regex;
use serde_json::{json, Value};

use super::error::{CoreError, CoreResult};
use crate::database::{Database, Dataset, DbError, DbErrorKind};
use crate::realtime::{Broker, BrokerEvent, EventKind};
use crate::schema::{self, SchemaValidator, SCHEMA_KEY};
use crate::search::{SearchEngine, SearchHit};

static NAME_PATTERN: OnceLock<Option<Regex>> = OnceLock::new();

/// Check a namespace or key against `[a-zA-Z0-9-]+`
pub fn validate_name(kind: &str, name: &str) -> CoreResult<()> {
    let pattern = NAME_PATTERN.get_or_init(|| Regex::new("^[a-zA-Z0-9-]+$").ok());
    let valid = match pattern {
        Some(re) => re.is_match(name),
        None => false,
    };
    if valid {
        Ok(())
    } else {
        Err(CoreError::bad_request(format!(
            "invalid {} '{}': only letters, digits and '-' are allowed",
            kind, name
        )))
    }
}

/// Request pipeline over the active backend
#[derive(Debug, Clone)]
pub struct DataService {
    db: Arc<dyn Database>,
    validator: SchemaValidator,
    search: SearchEngine,
    broker: Broker,
    auth_enabled: bool,
}

impl DataService {
    pub fn new(db: Arc<dyn Database>, broker: Broker, auth_enabled: bool) -> Self {
        Self {
            validator: SchemaValidator::new(db.clone()),
            search: SearchEngine::new(db.clone()),
            db,
            broker,
            auth_enabled,
        }
    }

    pub fn broker(&self) -> &Broker {
        &self.broker
    }

    pub fn auth_enabled(&self) -> bool {
        self.auth_enabled
    }

    fn publish(&self, event: BrokerEvent) {
        self.broker.publish(&event);
    }

    // ==================
    // Namespaces
    // ==================

    /// Public namespace names, sorted. Schema sub-namespaces are hidden.
    pub async fn list_namespaces(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .db
            .list_namespaces()
            .await
            .into_iter()
            .filter(|ns| !schema::is_schema_namespace(ns))
            .collect();
        names.sort();
        names
    }

    pub async fn create_namespace(&self, namespace: &str, user: Option<&str>) -> CoreResult<()> {
        validate_name("namespace", namespace)?;
        self.db.create_namespace(namespace).await?;
        tracing::info!(namespace, "namespace created");
        self.publish(BrokerEvent::new(EventKind::NamespaceCreated, namespace).with_user(user));
        Ok(())
    }

    /// Drop a namespace and every item in it. Its schema, if any, is kept.
    pub async fn drop_namespace(&self, namespace: &str, user: Option<&str>) -> CoreResult<()> {
        validate_name("namespace", namespace)?;
        self.db.delete_all(namespace).await?;
        tracing::info!(namespace, "namespace dropped");
        self.publish(BrokerEvent::new(EventKind::NamespaceDeleted, namespace).with_user(user));
        Ok(())
    }

    /// `DELETE /dataset/{ns}`; same effect as dropping the namespace
    pub async fn clear_dataset(&self, namespace: &str, user: Option<&str>) -> CoreResult<()> {
        self.drop_namespace(namespace, user).await
    }

    /// Every item of a namespace
    pub async fn list_items(&self, namespace: &str) -> CoreResult<Dataset> {
        validate_name("namespace", namespace)?;
        Ok(self.db.get_all(namespace).await?)
    }

    // ==================
    // Items
    // ==================

    pub async fn get_item(&self, namespace: &str, key: &str) -> CoreResult<Vec<u8>> {
        validate_name("namespace", namespace)?;
        validate_name("key", key)?;
        Ok(self.db.get(namespace, key).await?)
    }

    /// Create-only write; an existing key is a conflict.
    ///
    /// Returns the document as stored.
    pub async fn create(
        &self,
        namespace: &str,
        key: &str,
        body: &[u8],
        user: Option<&str>,
    ) -> CoreResult<Value> {
        self.write(namespace, key, body, user, false).await
    }

    /// Create-or-overwrite write
    pub async fn update(
        &self,
        namespace: &str,
        key: &str,
        body: &[u8],
        user: Option<&str>,
    ) -> CoreResult<Value> {
        self.write(namespace, key, body, user, true).await
    }

    async fn write(
        &self,
        namespace: &str,
        key: &str,
        body: &[u8],
        user: Option<&str>,
        allow_overwrite: bool,
    ) -> CoreResult<Value> {
        validate_name("namespace", namespace)?;
        validate_name("key", key)?;

        let document = self.validator.validate(namespace, body).await?;
        let (stored, written) = self.stored_form(body, &document, user)?;

        self.db
            .upsert(namespace, key, &stored, allow_overwrite)
            .await
            .map_err(write_error)?;

        let kind = if allow_overwrite {
            EventKind::ItemUpdated
        } else {
            EventKind::ItemCreated
        };
        tracing::debug!(namespace, key, %kind, "item written");
        self.publish(
            BrokerEvent::new(kind, namespace)
                .with_key(key)
                .with_value(document)
                .with_user(user),
        );
        Ok(written)
    }

    /// Raw body, or the `{user, data}` envelope when authentication is on
    fn stored_form(
        &self,
        body: &[u8],
        document: &Value,
        user: Option<&str>,
    ) -> CoreResult<(Vec<u8>, Value)> {
        if !self.auth_enabled {
            return Ok((body.to_vec(), document.clone()));
        }
        let envelope = json!({ "user": user, "data": document });
        let bytes = serde_json::to_vec(&envelope)
            .map_err(|e| CoreError::Storage(DbError::internal(format!("envelope: {}", e))))?;
        Ok((bytes, envelope))
    }

    pub async fn delete_item(&self, namespace: &str, key: &str, user: Option<&str>) -> CoreResult<()> {
        validate_name("namespace", namespace)?;
        validate_name("key", key)?;
        self.db.delete(namespace, key).await?;
        tracing::debug!(namespace, key, "item deleted");
        self.publish(
            BrokerEvent::new(EventKind::ItemDeleted, namespace)
                .with_key(key)
                .with_user(user),
        );
        Ok(())
    }

    // ==================
    // Search
    // ==================

    pub async fn search(&self, namespace: &str, filter: &str) -> CoreResult<Vec<SearchHit>> {
        validate_name("namespace", namespace)?;
        Ok(self.search.search(namespace, filter).await?)
    }

    // ==================
    // Schemas
    // ==================

    pub async fn get_schema(&self, namespace: &str) -> CoreResult<Vec<u8>> {
        validate_name("namespace", namespace)?;
        self.db
            .get(&schema::schema_namespace(namespace), SCHEMA_KEY)
            .await
            .map_err(|e| schema_error(namespace, e))
    }

    /// Store a schema. The body must be JSON that compiles as a schema.
    pub async fn set_schema(&self, namespace: &str, body: &[u8], user: Option<&str>) -> CoreResult<()> {
        validate_name("namespace", namespace)?;
        schema::compile(body).map_err(|e| CoreError::bad_request(e.to_string()))?;
        let document = schema::parse_json(body)?;

        self.db
            .upsert(&schema::schema_namespace(namespace), SCHEMA_KEY, body, true)
            .await?;
        tracing::info!(namespace, "schema stored");
        self.publish(
            BrokerEvent::new(EventKind::SchemaCreated, namespace)
                .with_value(document)
                .with_user(user),
        );
        Ok(())
    }

    pub async fn remove_schema(&self, namespace: &str, user: Option<&str>) -> CoreResult<()> {
        validate_name("namespace", namespace)?;
        self.db
            .delete_all(&schema::schema_namespace(namespace))
            .await
            .map_err(|e| schema_error(namespace, e))?;
        tracing::info!(namespace, "schema removed");
        self.publish(BrokerEvent::new(EventKind::SchemaDeleted, namespace).with_user(user));
        Ok(())
    }
}

/// Client-facing wording for write failures
fn write_error(err: DbError) -> CoreError {
    let err = match err.kind() {
        DbErrorKind::ItemConflict => DbError::new(DbErrorKind::ItemConflict, "resource already exists"),
        DbErrorKind::NamespaceNotFound => DbError::new(
            DbErrorKind::NamespaceNotFound,
            "namespace must be created first",
        ),
        _ => err,
    };
    CoreError::Storage(err)
}

fn schema_error(namespace: &str, err: DbError) -> CoreError {
    if err.is_not_found() {
        CoreError::SchemaNotFound(namespace.to_string())
    } else {
        CoreError::Storage(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::MemoryDatabase;
    use crate::realtime::{BrokerConfig, StreamedEvent};

    async fn service(auth_enabled: bool) -> (DataService, Broker, Arc<dyn Database>) {
        let db: Arc<dyn Database> = Arc::new(MemoryDatabase::new());
        db.init().await.unwrap();
        let broker = Broker::new(BrokerConfig::default());
        (DataService::new(db.clone(), broker.clone(), auth_enabled), broker, db)
    }

    /// Every event published so far
    fn published(broker: &Broker) -> Vec<BrokerEvent> {
        broker
            .subscribe(Some(0))
            .replay()
            .iter()
            .map(|StreamedEvent { data, .. }| serde_json::from_str(data).unwrap())
            .collect()
    }

    #[test]
    fn test_validate_name() {
        assert!(validate_name("key", "abc-123-XYZ").is_ok());
        for bad in ["", "a_b", "a/b", "..", "a b", "ü"] {
            assert!(validate_name("key", bad).is_err(), "{:?}", bad);
        }
    }

    #[tokio::test]
    async fn test_create_then_conflict() {
        let (svc, broker, _) = service(false).await;
        svc.create("users", "u1", b"{\"x\":1}", None).await.unwrap();

        let err = svc.create("users", "u1", b"{\"x\":2}", None).await.unwrap_err();
        assert_eq!(err.status_code(), 409);
        assert_eq!(err.to_string(), "resource already exists");
        assert_eq!(svc.get_item("users", "u1").await.unwrap(), b"{\"x\":1}");

        let events = published(&broker);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event, EventKind::ItemCreated);
    }

    #[tokio::test]
    async fn test_update_overwrites() {
        let (svc, broker, _) = service(false).await;
        svc.update("users", "u1", b"{\"x\":1}", None).await.unwrap();
        svc.update("users", "u1", b"{\"x\":2}", None).await.unwrap();
        assert_eq!(svc.get_item("users", "u1").await.unwrap(), b"{\"x\":2}");

        let kinds: Vec<EventKind> = published(&broker).iter().map(|e| e.event).collect();
        assert_eq!(kinds, vec![EventKind::ItemUpdated, EventKind::ItemUpdated]);
    }

    #[tokio::test]
    async fn test_one_event_per_mutation() {
        let (svc, broker, _) = service(false).await;
        svc.create_namespace("orders", Some("bob")).await.unwrap();
        svc.create("orders", "o1", b"{}", Some("bob")).await.unwrap();
        svc.update("orders", "o1", b"{\"n\":1}", Some("bob")).await.unwrap();
        svc.delete_item("orders", "o1", Some("bob")).await.unwrap();
        svc.drop_namespace("orders", Some("bob")).await.unwrap();

        let events = published(&broker);
        let kinds: Vec<EventKind> = events.iter().map(|e| e.event).collect();
        assert_eq!(
            kinds,
            vec![
                EventKind::NamespaceCreated,
                EventKind::ItemCreated,
                EventKind::ItemUpdated,
                EventKind::ItemDeleted,
                EventKind::NamespaceDeleted,
            ]
        );
        for event in &events {
            assert_eq!(event.namespace, "orders");
            assert_eq!(event.user_id.as_deref(), Some("bob"));
        }
        assert_eq!(events[1].key.as_deref(), Some("o1"));
        assert_eq!(events[2].value, Some(json!({"n": 1})));
        assert_eq!(events[3].key.as_deref(), Some("o1"));
    }

    #[tokio::test]
    async fn test_failed_mutation_publishes_nothing() {
        let (svc, broker, _) = service(false).await;
        assert!(svc.delete_item("ghost", "k", None).await.is_err());
        assert!(svc.drop_namespace("ghost", None).await.is_err());
        assert!(svc.create("n", "k", b"not json", None).await.is_err());
        assert!(svc.create("bad_ns", "k", b"{}", None).await.is_err());
        assert!(published(&broker).is_empty());
    }

    #[tokio::test]
    async fn test_envelope_when_auth_enabled() {
        let (svc, broker, _) = service(true).await;
        let written = svc.create("users", "u1", b"{\"x\":1}", Some("alice")).await.unwrap();
        assert_eq!(written, json!({"user": "alice", "data": {"x": 1}}));

        let stored: Value = serde_json::from_slice(&svc.get_item("users", "u1").await.unwrap()).unwrap();
        assert_eq!(stored, json!({"user": "alice", "data": {"x": 1}}));

        let events = published(&broker);
        assert_eq!(events[0].value, Some(json!({"x": 1})));
    }

    #[tokio::test]
    async fn test_schema_gates_writes() {
        let (svc, broker, _) = service(false).await;
        let schema = json!({"type": "object", "required": ["x"]}).to_string();
        svc.set_schema("people", schema.as_bytes(), None).await.unwrap();

        let err = svc.create("people", "p1", b"{\"y\":1}", None).await.unwrap_err();
        assert_eq!(err.status_code(), 400);
        svc.create("people", "p2", b"{\"x\":1}", None).await.unwrap();

        let kinds: Vec<EventKind> = published(&broker).iter().map(|e| e.event).collect();
        assert_eq!(kinds, vec![EventKind::SchemaCreated, EventKind::ItemCreated]);
    }

    #[tokio::test]
    async fn test_schema_lifecycle() {
        let (svc, _, _) = service(false).await;
        assert!(matches!(
            svc.get_schema("people").await,
            Err(CoreError::SchemaNotFound(_))
        ));

        let schema = br#"{"type":"object"}"#;
        svc.set_schema("people", schema, None).await.unwrap();
        assert_eq!(svc.get_schema("people").await.unwrap(), schema.to_vec());

        svc.remove_schema("people", None).await.unwrap();
        assert!(matches!(
            svc.remove_schema("people", None).await,
            Err(CoreError::SchemaNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_set_schema_rejects_broken_body() {
        let (svc, broker, _) = service(false).await;
        for body in [&b"nope"[..], &br#"{"type": 12}"#[..]] {
            let err = svc.set_schema("people", body, None).await.unwrap_err();
            assert_eq!(err.status_code(), 400);
        }
        assert!(published(&broker).is_empty());
    }

    #[tokio::test]
    async fn test_schema_namespaces_hidden() {
        let (svc, _, db) = service(false).await;
        svc.create_namespace("people", None).await.unwrap();
        svc.set_schema("people", b"{}", None).await.unwrap();
        db.create_namespace("alpha").await.unwrap();

        assert_eq!(svc.list_namespaces().await, vec!["alpha", "people"]);
    }

    #[tokio::test]
    async fn test_clear_dataset_twice() {
        let (svc, _, _) = service(false).await;
        svc.create_namespace("empty", None).await.unwrap();
        svc.clear_dataset("empty", None).await.unwrap();
        let err = svc.clear_dataset("empty", None).await.unwrap_err();
        assert_eq!(err.status_code(), 400);
    }

    #[tokio::test]
    async fn test_disabled_broker_does_not_block_writes() {
        let db: Arc<dyn Database> = Arc::new(MemoryDatabase::new());
        let svc = DataService::new(db, Broker::disabled(), false);
        svc.create("n", "k", b"1", None).await.unwrap();
        assert_eq!(svc.get_item("n", "k").await.unwrap(), b"1");
    }
}
