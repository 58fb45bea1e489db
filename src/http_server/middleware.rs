//! Request middleware
//!
//! - request ids: every request and response carries `x-request-id`
//! - bearer-token gate: runs before every REST handler when authentication
//!   is enabled. A client-supplied `x-user-id` header is always removed;
//!   after a token verifies, the header is set to the token's identity.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, HeaderValue, Method},
    middleware::Next,
    response::{IntoResponse, Response},
};

use uuid::Uuid;

use super::errors::ApiError;
use crate::auth::{bearer_token, AuthError, JwtVerifier};

/// Header carrying the authenticated identity to handlers
pub const USER_ID_HEADER: &str = "x-user-id";

/// Header correlating a request with its log lines
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Tag the request and its response with a fresh id
pub async fn request_id(mut request: Request, next: Next) -> Response {
    let id = Uuid::new_v4().to_string();
    let value = HeaderValue::from_str(&id).unwrap_or_else(|_| HeaderValue::from_static("unknown"));

    request.headers_mut().insert(REQUEST_ID_HEADER, value.clone());
    let mut response = next.run(request).await;
    response.headers_mut().insert(REQUEST_ID_HEADER, value);
    response
}

/// Identity set by the gate, if any
pub fn user_id(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(USER_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
}

/// Strip any client-supplied identity
pub async fn strip_identity(mut request: Request, next: Next) -> Response {
    request.headers_mut().remove(USER_ID_HEADER);
    next.run(request).await
}

/// Verify the bearer token and attach the identity
pub async fn require_auth(
    State(verifier): State<Arc<JwtVerifier>>,
    mut request: Request,
    next: Next,
) -> Response {
    request.headers_mut().remove(USER_ID_HEADER);

    // CORS preflight never carries credentials
    if request.method() == Method::OPTIONS {
        return next.run(request).await;
    }

    let identity = match authenticate(&verifier, request.headers()) {
        Ok(identity) => identity,
        Err(err) => {
            tracing::debug!(error = %err, path = %request.uri().path(), "request rejected");
            return ApiError::from(err).into_response();
        }
    };

    match HeaderValue::from_str(&identity) {
        Ok(value) => {
            request.headers_mut().insert(USER_ID_HEADER, value);
            next.run(request).await
        }
        Err(_) => ApiError::from(AuthError::MissingIdentity).into_response(),
    }
}

fn authenticate(verifier: &JwtVerifier, headers: &HeaderMap) -> Result<String, AuthError> {
    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(bearer_token)
        .ok_or(AuthError::MissingToken)?;
    verifier.authenticate(token)
}
