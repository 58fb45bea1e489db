//! Validation error types
//!
//! - `InvalidJson`: payload is not syntactically valid JSON (REJECT)
//! - `SchemaViolation`: payload breaks one or more schema rules (REJECT)
//! - `InvalidSchema`: the schema document itself does not compile

use thiserror::Error;

/// Result type for validation
pub type SchemaResult<T> = Result<T, ValidationError>;

/// Validation failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Payload is not JSON
    #[error("document is not valid JSON: {0}")]
    InvalidJson(String),

    /// Payload violates the namespace schema; one entry per violated rule
    #[error("document does not match schema: {}", .0.join("; "))]
    SchemaViolation(Vec<String>),

    /// Schema document cannot be used for validation
    #[error("invalid JSON schema: {0}")]
    InvalidSchema(String),
}

impl ValidationError {
    /// Every violated rule, empty for non-schema failures
    pub fn violations(&self) -> &[String] {
        match self {
            ValidationError::SchemaViolation(v) => v,
            _ => &[],
        }
    }
}
