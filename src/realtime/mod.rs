//! # Realtime Module
//!
//! Change notifications for every successful mutation, fanned out to
//! Server-Sent-Events subscribers.
//!
//! - **Events**: `BrokerEvent` wire format
//! - **Broker**: single-topic publish/subscribe with short replay retention

pub mod broker;
pub mod event;

pub use broker::{
    Broker, BrokerConfig, StreamedEvent, Subscription, DEFAULT_EVENT_TTL, HEARTBEAT_INTERVAL,
    TOPIC,
};
pub use event::{BrokerEvent, EventKind};
