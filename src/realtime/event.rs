//! # Broker Events
//!
//! Change notifications describing a just-completed mutation. Events are
//! never persisted; they are published to the broker and discarded.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Kind of mutation an event describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventKind {
    ItemCreated,
    ItemUpdated,
    ItemDeleted,
    NamespaceCreated,
    NamespaceDeleted,
    SchemaCreated,
    SchemaDeleted,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::ItemCreated => "ITEM_CREATED",
            EventKind::ItemUpdated => "ITEM_UPDATED",
            EventKind::ItemDeleted => "ITEM_DELETED",
            EventKind::NamespaceCreated => "NAMESPACE_CREATED",
            EventKind::NamespaceDeleted => "NAMESPACE_DELETED",
            EventKind::SchemaCreated => "SCHEMA_CREATED",
            EventKind::SchemaDeleted => "SCHEMA_DELETED",
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Change notification published after a successful mutation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrokerEvent {
    /// Mutation kind
    pub event: EventKind,

    /// Acting user, when authentication is enabled
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,

    /// Affected namespace
    pub namespace: String,

    /// Affected item key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,

    /// Validated payload for item writes, schema document for schema writes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

impl BrokerEvent {
    /// Create an event for `namespace` with no key or value
    pub fn new(event: EventKind, namespace: impl Into<String>) -> Self {
        Self {
            event,
            user_id: None,
            namespace: namespace.into(),
            key: None,
            value: None,
        }
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn with_value(mut self, value: Value) -> Self {
        self.value = Some(value);
        self
    }

    /// Attach the acting user; empty identities are dropped
    pub fn with_user(mut self, user_id: Option<&str>) -> Self {
        self.user_id = user_id.filter(|u| !u.is_empty()).map(str::to_string);
        self
    }
}
