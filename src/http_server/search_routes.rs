//! Search HTTP Routes
//!
//! `GET /search/:ns?filter=<expr>` runs a filter over every document of a
//! namespace and answers `{"results": [{"key", "value"}, ...]}`.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};

use super::errors::ApiError;
use super::state::ApiState;
use crate::search::SearchHit;

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub filter: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SearchResponse {
    pub results: Vec<SearchHit>,
}

/// Create search routes
pub fn search_routes(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/search/:ns", get(search_handler))
        .with_state(state)
}

async fn search_handler(
    State(state): State<Arc<ApiState>>,
    Path(ns): Path<String>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<SearchResponse>, ApiError> {
    let filter = query
        .filter
        .ok_or_else(|| ApiError::bad_request("missing 'filter' query parameter"))?;

    let results = state.service.search(&ns, &filter).await?;
    Ok(Json(SearchResponse { results }))
}
