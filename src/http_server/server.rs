//! # HTTP Server
//!
//! Assembles the REST router and the broker router and serves them on
//! their own listeners until Ctrl-C.
//!
//! REST layers, outermost first: CORS, request id, tracing, timeout,
//! gzip compression, body limit, then the identity gate on matched routes.

use std::future::IntoFuture;
use std::io;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::{DefaultBodyLimit, Request},
    middleware, Router,
};
use tokio::net::TcpListener;
use tower_http::{
    classify::{ServerErrorsAsFailures, SharedClassifier},
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use super::broker_routes::broker_routes;
use super::config::{ConfigError, ServerConfig};
use super::dataset_routes::dataset_routes;
use super::middleware::{request_id, require_auth, strip_identity, REQUEST_ID_HEADER};
use super::namespace_routes::namespace_routes;
use super::openapi_routes::openapi_routes;
use super::schema_routes::schema_routes;
use super::search_routes::search_routes;
use super::state::ApiState;
use crate::auth::JwtVerifier;
use crate::core::DataService;

/// Largest accepted request body
pub const MAX_BODY_BYTES: usize = 1_048_576;

/// Per-request deadline
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// REST and broker servers sharing one data service
pub struct HttpServer {
    config: ServerConfig,
    state: Arc<ApiState>,
    verifier: Option<Arc<JwtVerifier>>,
}

impl HttpServer {
    /// `verifier` turns on the bearer-token gate
    pub fn new(config: ServerConfig, service: DataService, verifier: Option<JwtVerifier>) -> Self {
        Self {
            config,
            state: Arc::new(ApiState::new(service)),
            verifier: verifier.map(Arc::new),
        }
    }

    /// The REST router with every layer applied (also used by tests)
    pub fn router(&self) -> Router {
        let mut router = Router::new()
            .merge(namespace_routes(self.state.clone()))
            .merge(dataset_routes(self.state.clone()))
            .merge(search_routes(self.state.clone()))
            .merge(schema_routes(self.state.clone()));

        if self.config.swagger_enabled {
            router = router.merge(openapi_routes(self.state.clone()));
        }

        let router = match &self.verifier {
            Some(verifier) => {
                router.route_layer(middleware::from_fn_with_state(verifier.clone(), require_auth))
            }
            None => router.route_layer(middleware::from_fn(strip_identity)),
        };

        router
            .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
            .layer(CompressionLayer::new())
            .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
            .layer(trace_layer())
            .layer(middleware::from_fn(request_id))
            .layer(cors_layer())
    }

    /// The event stream router for the broker listener
    pub fn broker_router(&self) -> Router {
        broker_routes(self.state.service.broker().clone())
            .layer(trace_layer())
            .layer(cors_layer())
    }

    /// Bind the listeners and serve until Ctrl-C
    pub async fn start(self) -> io::Result<()> {
        let api_addr = self.config.socket_addr().map_err(invalid_input)?;
        let api_listener = TcpListener::bind(api_addr).await?;
        tracing::info!(addr = %api_addr, auth = self.verifier.is_some(), swagger = self.config.swagger_enabled, "REST server listening");

        let api = axum::serve(api_listener, self.router())
            .with_graceful_shutdown(shutdown_signal())
            .into_future();

        if !self.config.broker_enabled {
            return api.await;
        }

        let broker_addr = self.config.broker_socket_addr().map_err(invalid_input)?;
        let broker_listener = TcpListener::bind(broker_addr).await?;
        tracing::info!(addr = %broker_addr, "broker server listening");

        // Event streams never finish on their own, so the broker listener
        // stops together with the REST server instead of draining.
        let broker = axum::serve(broker_listener, self.broker_router()).into_future();
        tokio::select! {
            result = api => result,
            result = broker => result,
        }
    }
}

fn invalid_input(err: ConfigError) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidInput, err.to_string())
}

fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
}

fn trace_layer() -> TraceLayer<
    SharedClassifier<ServerErrorsAsFailures>,
    impl Fn(&Request<Body>) -> tracing::Span + Clone,
> {
    TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
        let request_id = request
            .headers()
            .get(REQUEST_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("-");
        tracing::info_span!(
            "request",
            method = %request.method(),
            uri = %request.uri(),
            request_id,
        )
    })
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("shutdown signal received"),
        Err(e) => tracing::error!(error = %e, "failed to listen for shutdown signal"),
    }
}
