//! Core Error Types
//!
//! Unified error for the request-processing pipeline. Every variant maps to
//! exactly one HTTP status.

use thiserror::Error;

use crate::database::{DbError, DbErrorKind};
use crate::schema::ValidationError;
use crate::search::SearchError;

/// Core module result type
pub type CoreResult<T> = Result<T, CoreError>;

/// Core error type
#[derive(Debug, Clone, Error)]
pub enum CoreError {
    /// Malformed request: invalid name, unknown format, unusable schema body
    #[error("{0}")]
    BadRequest(String),

    /// Namespace has no schema
    #[error("no schema defined for namespace '{0}'")]
    SchemaNotFound(String),

    /// Storage layer failure
    #[error("{0}")]
    Storage(#[from] DbError),

    /// Payload rejected before reaching storage
    #[error("{0}")]
    Validation(#[from] ValidationError),

    /// Search failure
    #[error("{0}")]
    Search(#[from] SearchError),
}

impl CoreError {
    /// Create a bad request error
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    /// HTTP status for this error
    pub fn status_code(&self) -> u16 {
        match self {
            Self::BadRequest(_) => 400,
            Self::SchemaNotFound(_) => 404,
            Self::Storage(e) => storage_status(e),
            Self::Validation(ValidationError::InvalidSchema(_)) => 500,
            Self::Validation(_) => 400,
            Self::Search(SearchError::InvalidFilter(_)) => 400,
            Self::Search(SearchError::Storage(e)) => storage_status(e),
            Self::Search(_) => 500,
        }
    }

    /// Get error code for API responses
    pub fn code(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => "BAD_REQUEST",
            Self::SchemaNotFound(_) => "SCHEMA_NOT_FOUND",
            Self::Storage(e) => e.kind().code(),
            Self::Validation(ValidationError::InvalidSchema(_)) => "INVALID_SCHEMA",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Search(SearchError::InvalidFilter(_)) => "INVALID_FILTER",
            Self::Search(SearchError::Storage(e)) => e.kind().code(),
            Self::Search(_) => "SEARCH_ERROR",
        }
    }
}

fn storage_status(err: &DbError) -> u16 {
    match err.kind() {
        DbErrorKind::NamespaceNotFound => 400,
        DbErrorKind::IdNotFound => 404,
        DbErrorKind::ItemConflict => 409,
        DbErrorKind::Internal => 500,
    }
}
