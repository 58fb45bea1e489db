//! Namespace HTTP Routes
//!
//! - `GET /namespace` - list namespace names
//! - `POST /namespace/:ns` - create a namespace
//! - `GET /namespace/:ns` - every item of the namespace as `{key: value}`
//! - `DELETE /namespace/:ns` - drop the namespace and its items

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};

use super::dataset_routes::{render_listing, ListingFormat};
use super::errors::ApiError;
use super::middleware::user_id;
use super::state::ApiState;

/// Create namespace routes
pub fn namespace_routes(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/namespace", get(list_namespaces_handler))
        .route(
            "/namespace/:ns",
            post(create_namespace_handler)
                .get(namespace_items_handler)
                .delete(drop_namespace_handler),
        )
        .with_state(state)
}

async fn list_namespaces_handler(State(state): State<Arc<ApiState>>) -> Json<Vec<String>> {
    Json(state.service.list_namespaces().await)
}

async fn create_namespace_handler(
    State(state): State<Arc<ApiState>>,
    Path(ns): Path<String>,
    headers: HeaderMap,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    state.service.create_namespace(&ns, user_id(&headers)).await?;
    Ok((StatusCode::CREATED, Json(json!({}))))
}

async fn namespace_items_handler(
    State(state): State<Arc<ApiState>>,
    Path(ns): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let dataset = state.service.list_items(&ns).await?;
    Ok(Json(render_listing(&dataset, ListingFormat::Object)))
}

async fn drop_namespace_handler(
    State(state): State<Arc<ApiState>>,
    Path(ns): Path<String>,
    headers: HeaderMap,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    state.service.drop_namespace(&ns, user_id(&headers)).await?;
    Ok((StatusCode::ACCEPTED, Json(json!({}))))
}
