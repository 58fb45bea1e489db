//! # Event Broker
//!
//! Fire-and-forget fan-out of change notifications on a single topic.
//!
//! Each published event gets a monotonically increasing id, is kept in a
//! retention buffer for a short TTL, and is sent to every live subscriber
//! through a broadcast channel. Publishing never waits on a subscriber; a
//! subscriber that falls behind the channel capacity skips events.
//!
//! A reconnecting subscriber passes the last id it saw and first receives
//! every retained event after it, then live events.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use futures_util::stream::{self, Stream, StreamExt};
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;

use super::event::BrokerEvent;

/// The only topic events are published on
pub const TOPIC: &str = "messages";

/// How long published events stay available for replay
pub const DEFAULT_EVENT_TTL: Duration = Duration::from_secs(15);

/// Interval between keep-alive frames on a subscriber stream
pub const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

const DEFAULT_CAPACITY: usize = 1024;

/// Broker tuning
#[derive(Debug, Clone, Copy)]
pub struct BrokerConfig {
    /// Retention for replay to reconnecting subscribers
    pub event_ttl: Duration,
    /// Per-subscriber channel capacity before events are skipped
    pub capacity: usize,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            event_ttl: DEFAULT_EVENT_TTL,
            capacity: DEFAULT_CAPACITY,
        }
    }
}

/// A published event as sent on the wire
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamedEvent {
    /// Monotonic event id
    pub id: u64,
    /// Serialized `BrokerEvent`
    pub data: String,
}

#[derive(Debug)]
struct Retained {
    event: StreamedEvent,
    published_at: Instant,
}

#[derive(Debug)]
struct Inner {
    config: BrokerConfig,
    next_id: AtomicU64,
    retained: Mutex<VecDeque<Retained>>,
    sender: broadcast::Sender<StreamedEvent>,
}

/// Process-wide event broker. Cloning shares the same subscriber set.
#[derive(Debug, Clone)]
pub struct Broker {
    inner: Option<Arc<Inner>>,
}

impl Broker {
    /// Create an enabled broker
    pub fn new(config: BrokerConfig) -> Self {
        let (sender, _) = broadcast::channel(config.capacity.max(1));
        Self {
            inner: Some(Arc::new(Inner {
                config,
                next_id: AtomicU64::new(1),
                retained: Mutex::new(VecDeque::new()),
                sender,
            })),
        }
    }

    /// A broker whose `publish` does nothing
    pub fn disabled() -> Self {
        Self { inner: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.inner.is_some()
    }

    /// Number of connected subscribers
    pub fn subscriber_count(&self) -> usize {
        self.inner
            .as_ref()
            .map(|inner| inner.sender.receiver_count())
            .unwrap_or(0)
    }

    /// Publish an event to every subscriber.
    ///
    /// Returns the assigned id, or `None` when the broker is disabled or
    /// the event could not be serialized.
    pub fn publish(&self, event: &BrokerEvent) -> Option<u64> {
        let inner = self.inner.as_ref()?;

        let data = match serde_json::to_string(event) {
            Ok(data) => data,
            Err(e) => {
                tracing::warn!(error = %e, kind = %event.event, "dropping unserializable event");
                return None;
            }
        };

        let mut retained = inner.lock_retained();
        let id = inner.next_id.fetch_add(1, Ordering::SeqCst);
        let streamed = StreamedEvent { id, data };

        inner.prune(&mut retained);
        retained.push_back(Retained {
            event: streamed.clone(),
            published_at: Instant::now(),
        });

        // No receivers is not an error
        let delivered = inner.sender.send(streamed).unwrap_or(0);
        tracing::debug!(
            id,
            kind = %event.event,
            namespace = %event.namespace,
            delivered,
            "event published"
        );
        Some(id)
    }

    /// Register a subscriber.
    ///
    /// With `last_event_id`, retained events newer than it are replayed
    /// before live ones. A disabled broker yields a subscription that never
    /// produces events.
    pub fn subscribe(&self, last_event_id: Option<u64>) -> Subscription {
        let Some(inner) = self.inner.as_ref() else {
            return Subscription {
                replay: Vec::new(),
                receiver: None,
            };
        };

        // Holding the retention lock while subscribing keeps the replay and
        // the live channel free of gaps and duplicates.
        let mut retained = inner.lock_retained();
        let receiver = inner.sender.subscribe();
        inner.prune(&mut retained);

        let replay = match last_event_id {
            Some(last) => retained
                .iter()
                .filter(|r| r.event.id > last)
                .map(|r| r.event.clone())
                .collect(),
            None => Vec::new(),
        };

        Subscription {
            replay,
            receiver: Some(receiver),
        }
    }
}

impl Inner {
    fn lock_retained(&self) -> MutexGuard<'_, VecDeque<Retained>> {
        match self.retained.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn prune(&self, retained: &mut VecDeque<Retained>) {
        let ttl = self.config.event_ttl;
        while retained
            .front()
            .is_some_and(|r| r.published_at.elapsed() >= ttl)
        {
            retained.pop_front();
        }
    }
}

/// One subscriber's view of the broker
#[derive(Debug)]
pub struct Subscription {
    replay: Vec<StreamedEvent>,
    receiver: Option<broadcast::Receiver<StreamedEvent>>,
}

impl Subscription {
    /// Events replayed ahead of the live stream
    pub fn replay(&self) -> &[StreamedEvent] {
        &self.replay
    }

    /// Replayed events followed by live events. Skipped events from a lagging
    /// receiver are logged and dropped. The stream ends when the broker is
    /// dropped.
    pub fn into_stream(self) -> impl Stream<Item = StreamedEvent> + Send + 'static {
        let live = match self.receiver {
            Some(receiver) => BroadcastStream::new(receiver)
                .filter_map(|item| async move {
                    match item {
                        Ok(event) => Some(event),
                        Err(e) => {
                            tracing::debug!(error = %e, "subscriber lagged");
                            None
                        }
                    }
                })
                .boxed(),
            None => stream::pending().boxed(),
        };
        stream::iter(self.replay).chain(live)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::realtime::EventKind;

    fn event(key: &str) -> BrokerEvent {
        BrokerEvent::new(EventKind::ItemCreated, "users").with_key(key)
    }

    fn short_ttl(ttl: Duration) -> Broker {
        Broker::new(BrokerConfig {
            event_ttl: ttl,
            capacity: 16,
        })
    }

    #[test]
    fn test_disabled_broker_is_noop() {
        let broker = Broker::disabled();
        assert!(!broker.is_enabled());
        assert_eq!(broker.publish(&event("a")), None);
        assert!(broker.subscribe(Some(0)).replay().is_empty());
    }

    #[test]
    fn test_publish_without_subscribers() {
        let broker = Broker::new(BrokerConfig::default());
        assert_eq!(broker.publish(&event("a")), Some(1));
        assert_eq!(broker.publish(&event("b")), Some(2));
        assert_eq!(broker.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_live_subscriber_receives_events() {
        let broker = Broker::new(BrokerConfig::default());
        let mut stream = Box::pin(broker.subscribe(None).into_stream());
        assert_eq!(broker.subscriber_count(), 1);

        broker.publish(&event("a"));
        let received = stream.next().await.unwrap();
        assert_eq!(received.id, 1);
        let decoded: BrokerEvent = serde_json::from_str(&received.data).unwrap();
        assert_eq!(decoded.key.as_deref(), Some("a"));
    }

    #[tokio::test]
    async fn test_every_subscriber_gets_each_event() {
        let broker = Broker::new(BrokerConfig::default());
        let mut first = Box::pin(broker.subscribe(None).into_stream());
        let mut second = Box::pin(broker.subscribe(None).into_stream());

        broker.publish(&event("a"));
        assert_eq!(first.next().await.unwrap().id, 1);
        assert_eq!(second.next().await.unwrap().id, 1);
    }

    #[tokio::test]
    async fn test_reconnect_replays_newer_events() {
        let broker = Broker::new(BrokerConfig::default());
        for key in ["a", "b", "c"] {
            broker.publish(&event(key));
        }

        let subscription = broker.subscribe(Some(1));
        let ids: Vec<u64> = subscription.replay().iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![2, 3]);

        let mut stream = Box::pin(subscription.into_stream());
        broker.publish(&event("d"));
        let ids: Vec<u64> = vec![
            stream.next().await.unwrap().id,
            stream.next().await.unwrap().id,
            stream.next().await.unwrap().id,
        ];
        assert_eq!(ids, vec![2, 3, 4]);
    }

    #[test]
    fn test_expired_events_not_replayed() {
        let broker = short_ttl(Duration::from_millis(20));
        broker.publish(&event("old"));
        std::thread::sleep(Duration::from_millis(40));
        broker.publish(&event("new"));

        let ids: Vec<u64> = broker
            .subscribe(Some(0))
            .replay()
            .iter()
            .map(|e| e.id)
            .collect();
        assert_eq!(ids, vec![2]);
    }

    #[test]
    fn test_fresh_subscriber_gets_no_replay() {
        let broker = Broker::new(BrokerConfig::default());
        broker.publish(&event("a"));
        assert!(broker.subscribe(None).replay().is_empty());
    }
}
