//! Observability subsystem
//!
//! Structured logging through `tracing`. Every module logs with the
//! `tracing` macros; this module only installs the subscriber.

mod logging;

pub use logging::{build_filter, init_logging, validate_level, LogFormat};

use thiserror::Error;

/// Result type for observability setup
pub type ObservabilityResult<T> = Result<T, ObservabilityError>;

/// Observability setup failures
#[derive(Debug, Clone, Error)]
pub enum ObservabilityError {
    /// Level or format not understood
    #[error("invalid logging configuration: {0}")]
    InvalidConfig(String),

    /// A global subscriber could not be installed
    #[error("failed to initialize logging: {0}")]
    InitFailed(String),
}
