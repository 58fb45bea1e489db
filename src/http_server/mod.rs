//! # HTTP Server Module
//!
//! The REST surface over the data service, plus the event stream.
//!
//! # Endpoints
//!
//! - `/namespace`, `/namespace/:ns` - namespace management
//! - `/dataset/:ns`, `/dataset/:ns/:key` - item reads and writes
//! - `/search/:ns?filter=` - filter queries
//! - `/schema/:ns` - per-namespace JSON schema
//! - `/openapi.json`, `/swagger.json` - generated API document (optional)
//! - `/broker` - Server-Sent Events, on the broker listener

pub mod broker_routes;
pub mod config;
pub mod dataset_routes;
pub mod errors;
pub mod middleware;
pub mod namespace_routes;
pub mod openapi_routes;
pub mod schema_routes;
pub mod search_routes;
pub mod server;
pub mod state;

pub use config::{ConfigError, ServerConfig};
pub use errors::{ApiError, ErrorResponse};
pub use middleware::{REQUEST_ID_HEADER, USER_ID_HEADER};
pub use server::{HttpServer, MAX_BODY_BYTES, REQUEST_TIMEOUT};
pub use state::ApiState;
