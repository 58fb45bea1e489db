//! # Search Engine
//!
//! Runs a filter over every document of a namespace. Each stored value is
//! parsed as JSON and fed to the filter; every output becomes one hit
//! tagged with the document key. The first evaluation error aborts the
//! whole search, no partial results are returned.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::ast::Expr;
use super::errors::{FilterResult, SearchError, SearchResult};
use super::eval::{eval, ValueStream};
use super::parser::parse;
use crate::database::Database;

/// A compiled filter expression
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    source: String,
    expr: Expr,
}

impl Filter {
    /// Parse `source` into a reusable filter
    pub fn parse(source: &str) -> FilterResult<Self> {
        Ok(Self {
            source: source.to_string(),
            expr: parse(source)?,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Run the filter against one document, yielding each output in order
    /// as it is computed. An error is yielded last and ends the sequence.
    pub fn run(&self, input: &Value) -> Outputs<'_> {
        Outputs {
            inner: eval(&self.expr, input.clone()),
            failed: false,
        }
    }
}

/// Outputs of one filter run
pub struct Outputs<'a> {
    inner: ValueStream<'a>,
    failed: bool,
}

impl Iterator for Outputs<'_> {
    type Item = FilterResult<Value>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        let item = self.inner.next()?;
        self.failed = item.is_err();
        Some(item)
    }
}

/// One search result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    /// Key of the document that produced the output
    pub key: String,
    /// Filter output
    pub value: Value,
}

/// Search engine bound to the active storage backend
#[derive(Debug, Clone)]
pub struct SearchEngine {
    db: Arc<dyn Database>,
}

impl SearchEngine {
    pub fn new(db: Arc<dyn Database>) -> Self {
        Self { db }
    }

    /// Run `filter` over every document in `namespace`.
    ///
    /// Hits are ordered by document key, then by output order. The filter
    /// is parsed before the namespace is read.
    ///
    /// # Errors
    ///
    /// - `InvalidFilter` if the filter does not parse
    /// - `Storage` if the namespace cannot be read
    /// - `InvalidDocument` if a stored value is not JSON
    /// - `Evaluation` if the filter fails on any document
    pub async fn search(&self, namespace: &str, filter: &str) -> SearchResult<Vec<SearchHit>> {
        let filter = Filter::parse(filter).map_err(SearchError::InvalidFilter)?;
        let dataset = self.db.get_all(namespace).await?;

        let mut keys: Vec<&String> = dataset.keys().collect();
        keys.sort();

        let mut hits = Vec::new();
        for key in keys {
            let document: Value =
                serde_json::from_slice(&dataset[key]).map_err(|e| SearchError::InvalidDocument {
                    key: key.clone(),
                    message: e.to_string(),
                })?;

            for output in filter.run(&document) {
                let value = output.map_err(|source| SearchError::Evaluation {
                    key: key.clone(),
                    source,
                })?;
                hits.push(SearchHit {
                    key: key.clone(),
                    value,
                });
            }
        }

        tracing::debug!(
            namespace,
            filter = filter.source(),
            hits = hits.len(),
            "search completed"
        );
        Ok(hits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::MemoryDatabase;
    use crate::search::FilterError;
    use serde_json::json;

    async fn engine_with(items: &[(&str, Value)]) -> SearchEngine {
        let db: Arc<dyn Database> = Arc::new(MemoryDatabase::new());
        db.init().await.unwrap();
        for (key, value) in items {
            db.upsert("ns", key, value.to_string().as_bytes(), true)
                .await
                .unwrap();
        }
        SearchEngine::new(db)
    }

    fn hit(key: &str, value: Value) -> SearchHit {
        SearchHit {
            key: key.to_string(),
            value,
        }
    }

    #[tokio::test]
    async fn test_field_projection_per_item() {
        let engine = engine_with(&[("a", json!({"v": 1})), ("b", json!({"v": 2}))]).await;
        let hits = engine.search("ns", ".v").await.unwrap();
        assert_eq!(hits, vec![hit("a", json!(1)), hit("b", json!(2))]);
    }

    #[tokio::test]
    async fn test_select_drops_items() {
        let engine = engine_with(&[
            ("a", json!({"age": 20})),
            ("b", json!({"age": 40})),
            ("c", json!({"age": 60})),
        ])
        .await;
        let hits = engine
            .search("ns", "select(.age >= 40) | .age")
            .await
            .unwrap();
        assert_eq!(hits, vec![hit("b", json!(40)), hit("c", json!(60))]);
    }

    #[tokio::test]
    async fn test_multiple_outputs_share_key() {
        let engine = engine_with(&[("a", json!({"tags": ["x", "y"]}))]).await;
        let hits = engine.search("ns", ".tags[]").await.unwrap();
        assert_eq!(hits, vec![hit("a", json!("x")), hit("a", json!("y"))]);
    }

    #[tokio::test]
    async fn test_evaluation_error_aborts() {
        let engine = engine_with(&[("a", json!({"v": [1]})), ("b", json!({"v": 3}))]).await;
        let err = engine.search("ns", ".v[]").await.unwrap_err();
        match err {
            SearchError::Evaluation { key, .. } => assert_eq!(key, "b"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_invalid_filter_is_reported_before_reading() {
        let engine = engine_with(&[]).await;
        let err = engine.search("missing", ".[").await.unwrap_err();
        assert!(matches!(err, SearchError::InvalidFilter(_)));
    }

    #[tokio::test]
    async fn test_missing_namespace() {
        let engine = engine_with(&[]).await;
        let err = engine.search("missing", ".").await.unwrap_err();
        assert!(matches!(err, SearchError::Storage(e) if e.is_not_found()));
    }

    #[tokio::test]
    async fn test_non_json_document() {
        let db: Arc<dyn Database> = Arc::new(MemoryDatabase::new());
        db.upsert("ns", "raw", b"not json", true).await.unwrap();
        let err = SearchEngine::new(db).search("ns", ".").await.unwrap_err();
        assert!(matches!(err, SearchError::InvalidDocument { .. }));
    }

    #[test]
    fn test_filter_outputs_end_with_error() {
        let filter = Filter::parse(".[]").unwrap();
        let outputs: Vec<_> = filter.run(&json!(1)).collect();
        assert_eq!(outputs.len(), 1);
        assert!(outputs[0].is_err());
    }

    #[test]
    fn test_filter_outputs_before_error_are_kept() {
        let filter = Filter::parse(".[] | .x, .y").unwrap();
        let mut outputs = filter.run(&json!([{"x": 1, "y": 2}, 5, {"x": 3}]));
        assert_eq!(outputs.next(), Some(Ok(json!(1))));
        assert_eq!(outputs.next(), Some(Ok(json!(2))));
        assert!(matches!(outputs.next(), Some(Err(FilterError::Eval(_)))));
        assert_eq!(outputs.next(), None);
    }
}
