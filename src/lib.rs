//! unirest - a universal REST surface over pluggable key-value storage
//!
//! - `database`: storage contract and the memory, fs and sqlite backends
//! - `schema`: per-namespace JSON-schema validation
//! - `search`: jq-style filter language over namespace documents
//! - `realtime`: change-event broker
//! - `auth`: RSA JWT verification
//! - `core`: the request pipeline tying the above together
//! - `http_server`: axum routers, middleware and server lifecycle
//! - `observability`: logging setup
//! - `cli`: command-line entry points

pub mod auth;
pub mod cli;
pub mod core;
pub mod database;
pub mod http_server;
pub mod observability;
pub mod realtime;
pub mod schema;
pub mod search;
