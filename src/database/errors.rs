//! # Database Errors
//!
//! Every storage operation returns a value or exactly one `DbError`.

use std::fmt;

use thiserror::Error;

/// Result type for storage operations
pub type DbResult<T> = Result<T, DbError>;

/// Classification of a storage failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DbErrorKind {
    /// The namespace does not exist
    NamespaceNotFound,
    /// The key does not exist inside an existing namespace
    IdNotFound,
    /// Create-only write hit an existing key
    ItemConflict,
    /// Backend I/O, serialization or anything else
    Internal,
}

impl DbErrorKind {
    /// Returns the string code for this kind
    pub fn code(&self) -> &'static str {
        match self {
            DbErrorKind::NamespaceNotFound => "NAMESPACE_NOT_FOUND",
            DbErrorKind::IdNotFound => "ID_NOT_FOUND",
            DbErrorKind::ItemConflict => "ITEM_CONFLICT",
            DbErrorKind::Internal => "INTERNAL_ERROR",
        }
    }
}

impl fmt::Display for DbErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// A classified storage error with a human-readable message
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct DbError {
    kind: DbErrorKind,
    message: String,
}

impl DbError {
    /// Create an error of the given kind
    pub fn new(kind: DbErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Namespace is absent
    pub fn namespace_not_found(namespace: &str) -> Self {
        Self::new(
            DbErrorKind::NamespaceNotFound,
            format!("namespace '{}' does not exist", namespace),
        )
    }

    /// Key is absent inside the namespace
    pub fn id_not_found(namespace: &str, key: &str) -> Self {
        Self::new(
            DbErrorKind::IdNotFound,
            format!("value not found in namespace '{}' for key '{}'", namespace, key),
        )
    }

    /// Key already present and overwrite was not allowed
    pub fn item_conflict(namespace: &str, key: &str) -> Self {
        Self::new(
            DbErrorKind::ItemConflict,
            format!("item '{}' already exists in namespace '{}'", key, namespace),
        )
    }

    /// Backend failure
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(DbErrorKind::Internal, message)
    }

    /// Get the classification
    pub fn kind(&self) -> DbErrorKind {
        self.kind
    }

    /// Get the message
    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn is_not_found(&self) -> bool {
        matches!(
            self.kind,
            DbErrorKind::NamespaceNotFound | DbErrorKind::IdNotFound
        )
    }
}

impl From<std::io::Error> for DbError {
    fn from(e: std::io::Error) -> Self {
        Self::internal(format!("io error: {}", e))
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(e: rusqlite::Error) -> Self {
        Self::internal(format!("sqlite error: {}", e))
    }
}
