//! Schema HTTP Routes
//!
//! One JSON schema per namespace, checked against every later write.
//!
//! - `GET /schema/:ns` - the stored schema
//! - `POST /schema/:ns` - store or replace the schema
//! - `DELETE /schema/:ns` - remove the schema

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};

use super::dataset_routes::decode_value;
use super::errors::ApiError;
use super::middleware::user_id;
use super::state::ApiState;

/// Create schema routes
pub fn schema_routes(state: Arc<ApiState>) -> Router {
    Router::new()
        .route(
            "/schema/:ns",
            get(get_schema_handler)
                .post(set_schema_handler)
                .delete(remove_schema_handler),
        )
        .with_state(state)
}

async fn get_schema_handler(
    State(state): State<Arc<ApiState>>,
    Path(ns): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let schema = state.service.get_schema(&ns).await?;
    Ok(Json(decode_value(&schema)))
}

async fn set_schema_handler(
    State(state): State<Arc<ApiState>>,
    Path(ns): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    state
        .service
        .set_schema(&ns, &body, user_id(&headers))
        .await?;
    Ok((StatusCode::CREATED, Json(decode_value(&body))))
}

async fn remove_schema_handler(
    State(state): State<Arc<ApiState>>,
    Path(ns): Path<String>,
    headers: HeaderMap,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    state.service.remove_schema(&ns, user_id(&headers)).await?;
    Ok((StatusCode::ACCEPTED, Json(json!({}))))
}
