//! OpenAPI HTTP Routes
//!
//! `/openapi.json` and `/swagger.json` describe the REST surface for the
//! namespaces that currently exist. The document is read-only.

use std::sync::Arc;

use axum::{
    extract::State,
    routing::{get, MethodRouter},
    Json, Router,
};
use serde_json::{json, Map, Value};

use super::errors::ApiError;
use super::state::ApiState;

const OPENAPI_VERSION: &str = "3.0.3";

/// Create OpenAPI routes
pub fn openapi_routes(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/openapi.json", document_route())
        .route("/swagger.json", document_route())
        .with_state(state)
}

fn document_route() -> MethodRouter<Arc<ApiState>> {
    get(openapi_handler)
        .post(post_rejected)
        .delete(delete_rejected)
}

async fn openapi_handler(State(state): State<Arc<ApiState>>) -> Json<Value> {
    let namespaces = state.service.list_namespaces().await;
    Json(openapi_document(&namespaces))
}

async fn post_rejected() -> ApiError {
    ApiError::not_implemented("cannot POST to this endpoint!")
}

async fn delete_rejected() -> ApiError {
    ApiError::not_implemented("cannot DELETE this endpoint!")
}

/// Build the document for a set of namespaces
pub fn openapi_document(namespaces: &[String]) -> Value {
    let mut paths = Map::new();
    paths.insert(
        "/namespace".to_string(),
        json!({
            "get": operation("List namespaces", "Namespace names", None),
        }),
    );

    for ns in namespaces {
        paths.insert(
            format!("/namespace/{}", ns),
            json!({
                "post": operation(&format!("Create namespace '{}'", ns), "Created", None),
                "get": operation(&format!("All items in '{}'", ns), "Items keyed by id", None),
                "delete": operation(&format!("Drop namespace '{}'", ns), "Accepted", None),
            }),
        );
        paths.insert(
            format!("/dataset/{}", ns),
            json!({
                "get": {
                    "summary": format!("List items in '{}'", ns),
                    "parameters": [{
                        "name": "format",
                        "in": "query",
                        "required": false,
                        "schema": { "type": "string", "enum": ["1", "2", "3"] },
                    }],
                    "responses": responses("Items"),
                },
                "delete": operation(&format!("Delete every item in '{}'", ns), "Accepted", None),
            }),
        );
        paths.insert(
            format!("/dataset/{}/{{key}}", ns),
            json!({
                "parameters": [{
                    "name": "key",
                    "in": "path",
                    "required": true,
                    "schema": { "type": "string", "pattern": "^[a-zA-Z0-9-]+$" },
                }],
                "get": operation("Read an item", "The item", None),
                "post": operation("Create an item", "Created", Some(json_body())),
                "put": operation("Create or replace an item", "Created", Some(json_body())),
                "delete": operation("Delete an item", "Accepted", None),
            }),
        );
        paths.insert(
            format!("/search/{}", ns),
            json!({
                "get": {
                    "summary": format!("Filter the documents of '{}'", ns),
                    "parameters": [{
                        "name": "filter",
                        "in": "query",
                        "required": true,
                        "schema": { "type": "string" },
                    }],
                    "responses": responses("Matching outputs"),
                },
            }),
        );
        paths.insert(
            format!("/schema/{}", ns),
            json!({
                "get": operation("Read the schema", "The schema", None),
                "post": operation("Set the schema", "Created", Some(json_body())),
                "delete": operation("Remove the schema", "Accepted", None),
            }),
        );
    }

    json!({
        "openapi": OPENAPI_VERSION,
        "info": {
            "title": "unirest",
            "version": env!("CARGO_PKG_VERSION"),
        },
        "paths": paths,
        "components": {
            "schemas": {
                "Error": {
                    "type": "object",
                    "properties": {
                        "error": { "type": "string" },
                        "code": { "type": "integer" },
                    },
                },
            },
        },
    })
}

fn operation(summary: &str, description: &str, body: Option<Value>) -> Value {
    let mut op = json!({
        "summary": summary,
        "responses": responses(description),
    });
    if let (Some(body), Some(map)) = (body, op.as_object_mut()) {
        map.insert("requestBody".to_string(), body);
    }
    op
}

fn responses(description: &str) -> Value {
    let error = json!({
        "description": "Error",
        "content": {
            "application/json": { "schema": { "$ref": "#/components/schemas/Error" } },
        },
    });
    json!({
        "default": error,
        "2XX": {
            "description": description,
            "content": { "application/json": { "schema": {} } },
        },
    })
}

fn json_body() -> Value {
    json!({
        "required": true,
        "content": { "application/json": { "schema": { "type": "object" } } },
    })
}
