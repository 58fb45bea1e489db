//! Schema validator for incoming documents
//!
//! A namespace's schema lives in the private sub-namespace `<ns>_schema`
//! under the key `_schema`. Before a write:
//! - schema present: compile it, validate the payload, report every
//!   violated rule at once
//! - schema absent: the payload only has to be valid JSON
//!
//! A storage error while looking the schema up (other than not-found) is
//! treated as "no schema" and logged; it never fails the write.

use std::sync::Arc;

use serde_json::Value;

use super::errors::{SchemaResult, ValidationError};
use crate::database::Database;

/// Suffix marking a namespace's private schema sub-namespace
pub const SCHEMA_SUFFIX: &str = "_schema";

/// Key of the schema document inside the sub-namespace
pub const SCHEMA_KEY: &str = "_schema";

/// Name of the sub-namespace holding `namespace`'s schema
pub fn schema_namespace(namespace: &str) -> String {
    format!("{}{}", namespace, SCHEMA_SUFFIX)
}

/// Whether `namespace` is a schema sub-namespace
pub fn is_schema_namespace(namespace: &str) -> bool {
    namespace.ends_with(SCHEMA_SUFFIX)
}

/// Parse raw bytes as JSON
pub fn parse_json(data: &[u8]) -> SchemaResult<Value> {
    serde_json::from_slice(data).map_err(|e| ValidationError::InvalidJson(e.to_string()))
}

/// Compile a schema document
pub fn compile(schema: &[u8]) -> SchemaResult<jsonschema::Validator> {
    let schema: Value = serde_json::from_slice(schema)
        .map_err(|e| ValidationError::InvalidSchema(format!("not JSON: {}", e)))?;
    jsonschema::validator_for(&schema).map_err(|e| ValidationError::InvalidSchema(e.to_string()))
}

/// Validate `document` against a compiled schema, collecting every violation
pub fn check(validator: &jsonschema::Validator, document: &Value) -> SchemaResult<()> {
    let violations: Vec<String> = validator
        .iter_errors(document)
        .map(|err| {
            let path = err.instance_path.to_string();
            let path = if path.is_empty() { "(root)".to_string() } else { path };
            format!("{}: {}", path, err)
        })
        .collect();

    if violations.is_empty() {
        Ok(())
    } else {
        Err(ValidationError::SchemaViolation(violations))
    }
}

/// Validation engine bound to the active storage backend.
///
/// Validator does not mutate documents. The parsed value it returns is what
/// goes into broker events; the raw bytes are what get stored.
#[derive(Debug, Clone)]
pub struct SchemaValidator {
    db: Arc<dyn Database>,
}

impl SchemaValidator {
    /// Creates a new validator reading schemas from `db`.
    pub fn new(db: Arc<dyn Database>) -> Self {
        Self { db }
    }

    /// Fetch the raw schema document for `namespace`, if any.
    pub async fn lookup(&self, namespace: &str) -> Option<Vec<u8>> {
        match self.db.get(&schema_namespace(namespace), SCHEMA_KEY).await {
            Ok(schema) => Some(schema),
            Err(e) if e.is_not_found() => None,
            Err(e) => {
                tracing::warn!(
                    namespace,
                    error = %e,
                    "schema lookup failed, validating as plain JSON"
                );
                None
            }
        }
    }

    /// Validate a candidate payload for `namespace`.
    ///
    /// # Errors
    ///
    /// - `InvalidJson` if the payload does not parse
    /// - `SchemaViolation` listing every violated rule
    /// - `InvalidSchema` if the stored schema does not compile
    pub async fn validate(&self, namespace: &str, payload: &[u8]) -> SchemaResult<Value> {
        let Some(schema) = self.lookup(namespace).await else {
            return parse_json(payload);
        };

        let validator = compile(&schema)?;
        let document = parse_json(payload)?;

        if let Err(err) = check(&validator, &document) {
            tracing::info!(
                namespace,
                violations = err.violations().len(),
                "document rejected by schema"
            );
            return Err(err);
        }
        Ok(document)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::{Dataset, DbError, DbResult, MemoryDatabase};
    use async_trait::async_trait;
    use serde_json::json;

    /// Backend whose every read fails with an internal error
    #[derive(Debug)]
    struct BrokenReads;

    #[async_trait]
    impl Database for BrokenReads {
        async fn init(&self) -> DbResult<()> {
            Ok(())
        }

        async fn disconnect(&self) {}

        async fn create_namespace(&self, _namespace: &str) -> DbResult<()> {
            Ok(())
        }

        async fn upsert(
            &self,
            _namespace: &str,
            _key: &str,
            _value: &[u8],
            _allow_overwrite: bool,
        ) -> DbResult<()> {
            Ok(())
        }

        async fn get(&self, _namespace: &str, _key: &str) -> DbResult<Vec<u8>> {
            Err(DbError::internal("disk unavailable"))
        }

        async fn get_all(&self, _namespace: &str) -> DbResult<Dataset> {
            Err(DbError::internal("disk unavailable"))
        }

        async fn delete(&self, _namespace: &str, _key: &str) -> DbResult<()> {
            Ok(())
        }

        async fn delete_all(&self, _namespace: &str) -> DbResult<()> {
            Ok(())
        }

        async fn list_namespaces(&self) -> Vec<String> {
            Vec::new()
        }
    }

    async fn validator_with_schema(schema: Option<Value>) -> SchemaValidator {
        let db: Arc<dyn Database> = Arc::new(MemoryDatabase::new());
        db.init().await.unwrap();
        if let Some(schema) = schema {
            db.upsert(
                &schema_namespace("users"),
                SCHEMA_KEY,
                schema.to_string().as_bytes(),
                true,
            )
            .await
            .unwrap();
        }
        SchemaValidator::new(db)
    }

    fn person_schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "x": {"type": "integer"},
                "age": {"type": "integer", "minimum": 0}
            },
            "required": ["x"]
        })
    }

    #[test]
    fn test_schema_namespace_naming() {
        assert_eq!(schema_namespace("users"), "users_schema");
        assert!(is_schema_namespace("users_schema"));
        assert!(!is_schema_namespace("users"));
    }

    #[tokio::test]
    async fn test_without_schema_accepts_any_json() {
        let validator = validator_with_schema(None).await;
        let parsed = validator.validate("users", b"{\"y\":1}").await.unwrap();
        assert_eq!(parsed, json!({"y": 1}));

        let parsed = validator.validate("users", b"[1,2,3]").await.unwrap();
        assert_eq!(parsed, json!([1, 2, 3]));
    }

    #[tokio::test]
    async fn test_failed_lookup_validates_as_plain_json() {
        let validator = SchemaValidator::new(Arc::new(BrokenReads));
        assert_eq!(validator.lookup("users").await, None);

        let parsed = validator.validate("users", b"{\"y\":1}").await.unwrap();
        assert_eq!(parsed, json!({"y": 1}));

        let err = validator.validate("users", b"{not json").await.unwrap_err();
        assert!(matches!(err, ValidationError::InvalidJson(_)));
    }

    #[tokio::test]
    async fn test_without_schema_rejects_broken_json() {
        let validator = validator_with_schema(None).await;
        let err = validator.validate("users", b"{not json").await.unwrap_err();
        assert!(matches!(err, ValidationError::InvalidJson(_)));
    }

    #[tokio::test]
    async fn test_schema_accepts_valid_document() {
        let validator = validator_with_schema(Some(person_schema())).await;
        let parsed = validator.validate("users", b"{\"x\":1}").await.unwrap();
        assert_eq!(parsed["x"], 1);
    }

    #[tokio::test]
    async fn test_schema_rejects_missing_field() {
        let validator = validator_with_schema(Some(person_schema())).await;
        let err = validator.validate("users", b"{\"y\":1}").await.unwrap_err();
        assert!(matches!(err, ValidationError::SchemaViolation(_)));
        assert!(err.to_string().contains("\"x\""));
    }

    #[tokio::test]
    async fn test_schema_reports_every_violation() {
        let validator = validator_with_schema(Some(person_schema())).await;
        let err = validator
            .validate("users", b"{\"x\":\"one\",\"age\":-5}")
            .await
            .unwrap_err();
        assert_eq!(err.violations().len(), 2);
    }

    #[tokio::test]
    async fn test_schema_only_applies_to_its_namespace() {
        let validator = validator_with_schema(Some(person_schema())).await;
        assert!(validator.validate("orders", b"{\"y\":1}").await.is_ok());
    }

    #[tokio::test]
    async fn test_uncompilable_schema_is_reported() {
        let validator = validator_with_schema(Some(json!({"type": 12}))).await;
        let err = validator.validate("users", b"{}").await.unwrap_err();
        assert!(matches!(err, ValidationError::InvalidSchema(_)));
    }

    #[test]
    fn test_compile_rejects_non_json() {
        assert!(matches!(
            compile(b"not a schema"),
            Err(ValidationError::InvalidSchema(_))
        ));
    }
}
