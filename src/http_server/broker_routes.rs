//! Broker HTTP Routes
//!
//! `GET /broker` streams change notifications as Server-Sent Events on
//! the broker listener. Each frame carries the event id and the JSON
//! event; a `:heartbeat` comment keeps idle connections open. Clients
//! resume with the standard `Last-Event-ID` header.

use std::convert::Infallible;

use axum::{
    extract::{Query, State},
    http::HeaderMap,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    routing::get,
    Router,
};
use futures_util::StreamExt;
use serde::Deserialize;

use super::errors::ApiError;
use crate::realtime::{Broker, HEARTBEAT_INTERVAL, TOPIC};

const LAST_EVENT_ID_HEADER: &str = "last-event-id";

#[derive(Debug, Deserialize)]
pub struct StreamQuery {
    #[serde(default)]
    pub stream: Option<String>,
}

/// Create broker routes
pub fn broker_routes(broker: Broker) -> Router {
    Router::new()
        .route("/broker", get(stream_handler))
        .with_state(broker)
}

fn last_event_id(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(LAST_EVENT_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok())
}

async fn stream_handler(
    State(broker): State<Broker>,
    Query(query): Query<StreamQuery>,
    headers: HeaderMap,
) -> Response {
    if let Some(stream) = query.stream.as_deref() {
        if stream != TOPIC {
            return ApiError::not_found(format!("stream '{}' does not exist", stream))
                .into_response();
        }
    }

    let last_id = last_event_id(&headers);
    let subscription = broker.subscribe(last_id);
    tracing::debug!(
        last_event_id = ?last_id,
        replayed = subscription.replay().len(),
        "subscriber connected"
    );

    let events = subscription.into_stream().map(|event| {
        Ok::<_, Infallible>(Event::default().id(event.id.to_string()).data(event.data))
    });

    Sse::new(events)
        .keep_alive(
            KeepAlive::new()
                .interval(HEARTBEAT_INTERVAL)
                .text("heartbeat"),
        )
        .into_response()
}
