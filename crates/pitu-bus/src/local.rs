// ── In-process broker ──
//
// A complete bus session living inside the gateway process: topic fan-out
// with wildcard filters plus a named-shadow store that announces accepted
// updates on the bus, the same way an external shadow service does.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use bytes::Bytes;
use chrono::Utc;
use dashmap::DashMap;
use serde_json::{Map, Value, json};
use tokio::sync::mpsc;
use tracing::{debug, trace, warn};

use crate::error::Error;
use crate::message::{BusEvent, BusMessage, Payload};
use crate::session::BusSession;
use crate::shadow::{ShadowPage, update_accepted_topic};
use crate::subscription::Subscription;
use crate::topic::TopicFilter;

/// Shadow state sections an update may replace.
const STATE_SECTIONS: [&str; 2] = ["reported", "desired"];

/// Events buffered per subscription before a lagging subscriber starts
/// losing messages.
pub const DEFAULT_QUEUE_DEPTH: usize = 1024;

struct Subscriber {
    filter: TopicFilter,
    tx: mpsc::Sender<BusEvent>,
}

#[derive(Debug, Clone)]
struct ShadowRecord {
    state: Map<String, Value>,
    version: u64,
    timestamp: i64,
}

impl ShadowRecord {
    fn document(&self) -> Value {
        json!({
            "state": self.state,
            "version": self.version,
            "timestamp": self.timestamp,
        })
    }
}

struct LocalBusInner {
    subscribers: DashMap<u64, Subscriber>,
    next_id: AtomicU64,
    /// Keyed by `(thing, shadow)`.
    shadows: DashMap<(String, String), ShadowRecord>,
    closed: AtomicBool,
    queue_depth: usize,
}

/// In-memory bus session with an embedded shadow store.
///
/// Cheaply cloneable; every clone shares the same broker.
#[derive(Clone)]
pub struct LocalBus {
    inner: Arc<LocalBusInner>,
}

impl Default for LocalBus {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalBus {
    pub fn new() -> Self {
        Self::with_queue_depth(DEFAULT_QUEUE_DEPTH)
    }

    /// A broker whose subscriptions buffer at most `depth` events. A
    /// publish that finds a subscriber's queue full skips that subscriber
    /// rather than waiting for it.
    pub fn with_queue_depth(depth: usize) -> Self {
        Self {
            inner: Arc::new(LocalBusInner {
                subscribers: DashMap::new(),
                next_id: AtomicU64::new(1),
                shadows: DashMap::new(),
                closed: AtomicBool::new(false),
                queue_depth: depth.max(1),
            }),
        }
    }

    /// Number of subscriptions currently held open against this broker.
    pub fn active_subscriptions(&self) -> usize {
        self.inner.subscribers.len()
    }

    /// Number of shadow documents stored for `thing`.
    pub fn shadow_count(&self, thing: &str) -> usize {
        self.inner
            .shadows
            .iter()
            .filter(|entry| entry.key().0 == thing)
            .count()
    }

    /// Close the session: every open subscription stream ends and further
    /// calls fail with [`Error::Closed`].
    pub fn close(&self) {
        self.inner.closed.store(true, Ordering::SeqCst);
        // Dropping the senders ends every receiver's stream.
        self.inner.subscribers.clear();
        debug!("local bus closed");
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }

    /// Deliver a stream error to every subscription whose filter matches
    /// `topic`. Subscriptions stay open.
    pub fn report_stream_error(&self, topic: &str, reason: &str) {
        for entry in &self.inner.subscribers {
            if entry.filter.matches(topic) {
                let _ = entry.tx.try_send(BusEvent::StreamError(reason.to_owned()));
            }
        }
    }

    fn ensure_open(&self) -> Result<(), Error> {
        if self.is_closed() {
            Err(Error::Closed)
        } else {
            Ok(())
        }
    }

    /// Fan a message out to all matching subscribers, in registration-
    /// independent but per-subscriber publish order.
    fn dispatch(&self, message: &BusMessage) -> usize {
        let mut delivered = 0;
        let mut gone = Vec::new();

        for entry in &self.inner.subscribers {
            if !entry.filter.matches(&message.topic) {
                continue;
            }
            match entry.tx.try_send(BusEvent::Message(message.clone())) {
                Ok(()) => delivered += 1,
                Err(mpsc::error::TrySendError::Full(_)) => {
                    warn!(
                        id = *entry.key(),
                        topic = %message.topic,
                        "subscriber lagging, message dropped"
                    );
                }
                Err(mpsc::error::TrySendError::Closed(_)) => gone.push(*entry.key()),
            }
        }

        for id in gone {
            self.inner.subscribers.remove(&id);
        }

        delivered
    }

    fn apply_update(
        &self,
        thing: &str,
        shadow: &str,
        document: &[u8],
    ) -> Result<(Value, Value), Error> {
        let update: Value = serde_json::from_slice(document).map_err(|e| Error::InvalidDocument {
            message: e.to_string(),
        })?;
        let Some(state) = update.get("state").and_then(Value::as_object) else {
            return Err(Error::InvalidDocument {
                message: "document must contain a 'state' object".into(),
            });
        };

        let timestamp = Utc::now().timestamp();
        let key = (thing.to_owned(), shadow.to_owned());
        let mut record = self.inner.shadows.entry(key).or_insert_with(|| ShadowRecord {
            state: Map::new(),
            version: 0,
            timestamp,
        });

        // Each section present in the update replaces the stored one whole.
        for section in STATE_SECTIONS {
            match state.get(section) {
                Some(Value::Null) => {
                    record.state.remove(section);
                }
                Some(value) => {
                    record.state.insert(section.to_owned(), value.clone());
                }
                None => {}
            }
        }
        record.version += 1;
        record.timestamp = timestamp;

        let accepted = json!({
            "state": state,
            "version": record.version,
            "timestamp": timestamp,
        });
        Ok((accepted, record.document()))
    }
}

impl BusSession for LocalBus {
    async fn subscribe(&self, filter: &TopicFilter) -> Result<Subscription, Error> {
        self.ensure_open()?;

        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::channel(self.inner.queue_depth);
        self.inner.subscribers.insert(
            id,
            Subscriber {
                filter: filter.clone(),
                tx,
            },
        );
        debug!(id, filter = %filter, "subscription opened");

        let registry = Arc::downgrade(&self.inner);
        Ok(Subscription::new(filter.clone(), rx).on_release(move || {
            if let Some(inner) = registry.upgrade() {
                inner.subscribers.remove(&id);
            }
            trace!(id, "subscription released");
        }))
    }

    async fn publish(&self, topic: &str, payload: Payload) -> Result<(), Error> {
        self.ensure_open()?;
        if topic.contains(['+', '#']) {
            return Err(Error::Rejected {
                message: format!("cannot publish to wildcard topic '{topic}'"),
            });
        }

        let message = BusMessage::new(topic, payload);
        let delivered = self.dispatch(&message);
        trace!(topic, delivered, encoding = %message.payload.encoding(), "published");
        Ok(())
    }

    async fn get_shadow(&self, thing: &str, shadow: &str) -> Result<Bytes, Error> {
        self.ensure_open()?;

        let key = (thing.to_owned(), shadow.to_owned());
        let record = self
            .inner
            .shadows
            .get(&key)
            .map(|r| r.value().clone())
            .ok_or_else(|| Error::ShadowNotFound {
                thing: thing.to_owned(),
                shadow: shadow.to_owned(),
            })?;

        Ok(Bytes::from(record.document().to_string()))
    }

    async fn update_shadow(
        &self,
        thing: &str,
        shadow: &str,
        document: Bytes,
    ) -> Result<Bytes, Error> {
        self.ensure_open()?;

        let (accepted, current) = self.apply_update(thing, shadow, &document)?;
        let accepted = Bytes::from(accepted.to_string());
        debug!(
            thing,
            shadow,
            version = current["version"].as_u64().unwrap_or_default(),
            "shadow updated"
        );

        // Shadow services announce accepted updates as raw bytes.
        let delivered = self.dispatch(&BusMessage::new(
            update_accepted_topic(thing, shadow),
            Payload::Binary(accepted.clone()),
        ));
        trace!(thing, shadow, delivered, "update accepted announced");

        Ok(accepted)
    }

    async fn list_shadows(
        &self,
        thing: &str,
        page_size: u32,
        next_token: Option<String>,
    ) -> Result<ShadowPage, Error> {
        self.ensure_open()?;

        if page_size == 0 {
            return Err(Error::Rejected {
                message: "page size must be at least 1".into(),
            });
        }

        let offset = match next_token.as_deref() {
            None => 0,
            Some(token) => token.parse::<usize>().map_err(|_| Error::Rejected {
                message: format!("invalid next token '{token}'"),
            })?,
        };

        let mut names: Vec<String> = self
            .inner
            .shadows
            .iter()
            .filter(|entry| entry.key().0 == thing)
            .map(|entry| entry.key().1.clone())
            .collect();
        names.sort();

        let size = usize::try_from(page_size).unwrap_or(usize::MAX);
        let end = offset.saturating_add(size).min(names.len());
        let results = names.get(offset..end).map(<[String]>::to_vec).unwrap_or_default();
        let next_token = (end < names.len()).then(|| end.to_string());

        if results.is_empty() && offset > 0 {
            warn!(thing, offset, "shadow listing token past the end");
        }

        Ok(ShadowPage {
            results,
            next_token,
            timestamp: Utc::now().timestamp(),
        })
    }
}
