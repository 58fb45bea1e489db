//! # Auth Errors
//!
//! Error types for the authentication module.

use thiserror::Error;

/// Result type for auth operations
pub type AuthResult<T> = Result<T, AuthError>;

/// Authentication errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    // ==================
    // Request Errors
    // ==================
    /// No `Authorization: Bearer` header
    #[error("Authentication required")]
    MissingToken,

    /// JWT token is malformed
    #[error("Malformed token")]
    MalformedToken,

    /// JWT token has expired
    #[error("Token expired")]
    TokenExpired,

    /// JWT signature is invalid
    #[error("Invalid token signature")]
    InvalidSignature,

    /// Token carries no usable identity claim
    #[error("Token has no subject")]
    MissingIdentity,

    // ==================
    // Setup Errors
    // ==================
    /// Public key could not be read or parsed
    #[error("Invalid public key: {0}")]
    InvalidKey(String),
}

impl AuthError {
    /// Returns the HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        match self {
            AuthError::InvalidKey(_) => 500,
            _ => 401,
        }
    }

    /// Returns the error code string
    pub fn code(&self) -> &'static str {
        match self {
            AuthError::MissingToken => "AUTH_REQUIRED",
            AuthError::MalformedToken => "MALFORMED_TOKEN",
            AuthError::TokenExpired => "TOKEN_EXPIRED",
            AuthError::InvalidSignature => "INVALID_SIGNATURE",
            AuthError::MissingIdentity => "MISSING_IDENTITY",
            AuthError::InvalidKey(_) => "INVALID_KEY",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_errors_are_unauthorized() {
        for err in [
            AuthError::MissingToken,
            AuthError::MalformedToken,
            AuthError::TokenExpired,
            AuthError::InvalidSignature,
            AuthError::MissingIdentity,
        ] {
            assert_eq!(err.status_code(), 401, "{}", err);
        }
    }

    #[test]
    fn test_key_error_is_internal() {
        assert_eq!(AuthError::InvalidKey("x".into()).status_code(), 500);
    }
}
