//! Dataset HTTP Routes
//!
//! Whole-namespace listings and per-key item reads and writes.
//!
//! - `GET /dataset/:ns?format=1|2|3` - list every item
//! - `DELETE /dataset/:ns` - delete every item
//! - `GET | POST | PUT | DELETE /dataset/:ns/:key` - single item

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Map, Value};

use super::errors::ApiError;
use super::middleware::user_id;
use super::state::ApiState;
use crate::database::Dataset;

/// Shape of a dataset listing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListingFormat {
    /// `{key: value}`
    Object,
    /// `[{key, value}]`
    Entries,
    /// `[value]`
    Values,
}

impl ListingFormat {
    /// Parse the `format` query parameter; absent or empty means `1`
    pub fn parse(raw: Option<&str>) -> Result<Self, ApiError> {
        match raw.unwrap_or("") {
            "" | "1" => Ok(ListingFormat::Object),
            "2" => Ok(ListingFormat::Entries),
            "3" => Ok(ListingFormat::Values),
            other => Err(ApiError::bad_request(format!(
                "invalid query: unknown format '{}'",
                other
            ))),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ListingQuery {
    #[serde(default)]
    pub format: Option<String>,
}

/// Stored bytes as JSON; anything unparseable becomes a JSON string
pub fn decode_value(bytes: &[u8]) -> Value {
    serde_json::from_slice(bytes)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(bytes).into_owned()))
}

/// Render a dataset in the requested shape, ordered by key
pub fn render_listing(dataset: &Dataset, format: ListingFormat) -> Value {
    let mut entries: Vec<(&String, &Vec<u8>)> = dataset.iter().collect();
    entries.sort_by(|a, b| a.0.cmp(b.0));

    match format {
        ListingFormat::Object => Value::Object(
            entries
                .into_iter()
                .map(|(k, v)| (k.clone(), decode_value(v)))
                .collect::<Map<String, Value>>(),
        ),
        ListingFormat::Entries => Value::Array(
            entries
                .into_iter()
                .map(|(k, v)| json!({ "key": k, "value": decode_value(v) }))
                .collect(),
        ),
        ListingFormat::Values => {
            Value::Array(entries.into_iter().map(|(_, v)| decode_value(v)).collect())
        }
    }
}

/// Create dataset routes
pub fn dataset_routes(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/dataset/:ns", get(list_handler).delete(clear_handler))
        .route(
            "/dataset/:ns/:key",
            get(get_item_handler)
                .post(create_item_handler)
                .put(update_item_handler)
                .delete(delete_item_handler),
        )
        .with_state(state)
}

async fn list_handler(
    State(state): State<Arc<ApiState>>,
    Path(ns): Path<String>,
    Query(query): Query<ListingQuery>,
) -> Result<Json<Value>, ApiError> {
    let format = ListingFormat::parse(query.format.as_deref())?;
    let dataset = state.service.list_items(&ns).await?;
    Ok(Json(render_listing(&dataset, format)))
}

async fn clear_handler(
    State(state): State<Arc<ApiState>>,
    Path(ns): Path<String>,
    headers: HeaderMap,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    state.service.clear_dataset(&ns, user_id(&headers)).await?;
    Ok((StatusCode::ACCEPTED, Json(json!({}))))
}

async fn get_item_handler(
    State(state): State<Arc<ApiState>>,
    Path((ns, key)): Path<(String, String)>,
) -> Result<Json<Value>, ApiError> {
    let bytes = state.service.get_item(&ns, &key).await?;
    Ok(Json(decode_value(&bytes)))
}

/// POST never overwrites an existing key
async fn create_item_handler(
    State(state): State<Arc<ApiState>>,
    Path((ns, key)): Path<(String, String)>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let written = state
        .service
        .create(&ns, &key, &body, user_id(&headers))
        .await?;
    Ok((StatusCode::CREATED, Json(written)))
}

async fn update_item_handler(
    State(state): State<Arc<ApiState>>,
    Path((ns, key)): Path<(String, String)>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let written = state
        .service
        .update(&ns, &key, &body, user_id(&headers))
        .await?;
    Ok((StatusCode::CREATED, Json(written)))
}

async fn delete_item_handler(
    State(state): State<Arc<ApiState>>,
    Path((ns, key)): Path<(String, String)>,
    headers: HeaderMap,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    state
        .service
        .delete_item(&ns, &key, user_id(&headers))
        .await?;
    Ok((StatusCode::ACCEPTED, Json(json!({}))))
}
