//! # Authentication Module
//!
//! Optional bearer-token gate. Tokens are RSA-signed JWTs verified against
//! a configured public key; the verified identity is attached to each
//! request and recorded in stored envelopes and broker events.

pub mod errors;
pub mod jwt;

pub use errors::{AuthError, AuthResult};
pub use jwt::{bearer_token, JwtClaims, JwtVerifier};
