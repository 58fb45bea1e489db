//! Validation engine
//!
//! Optional per-namespace JSON-schema constraints, enforced before every
//! write reaches the storage backend.

mod errors;
mod validator;

pub use errors::{SchemaResult, ValidationError};
pub use validator::{
    check, compile, is_schema_namespace, parse_json, schema_namespace, SchemaValidator,
    SCHEMA_KEY, SCHEMA_SUFFIX,
};
