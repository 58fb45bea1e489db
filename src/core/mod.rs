//! # Core Module
//!
//! The request-processing pipeline shared by every route: name checks,
//! schema validation, the create/update conflict policy, storage calls and
//! event publication.

pub mod error;
pub mod service;

pub use error::{CoreError, CoreResult};
pub use service::{validate_name, DataService};
