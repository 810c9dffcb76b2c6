// ── Telemetry ingest loop ──
//
// One long-lived subscription to the telemetry topic. Every message is
// parsed, sanitized, and reported into the telemetry shadow. Per-message
// failures are logged and dropped; the subscription is never torn down
// because of them.

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use pitu_bus::{BusEvent, BusMessage, BusSession, TopicFilter};

use crate::config::IngestConfig;
use crate::error::CoreError;
use crate::publisher::ShadowPublisher;
use crate::sanitize::RedactionRuleSet;

/// Lifecycle of the ingest subscription.
///
/// `Idle → Subscribing → Active`. A stream-level error moves to
/// `Degraded`, which keeps processing whatever still arrives; nothing
/// resubscribes. End-of-stream or shutdown moves to `Closed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum IngestState {
    Idle,
    Subscribing,
    Active,
    Degraded,
    Closed,
}

/// Subscribes to raw telemetry and keeps the telemetry shadow current.
pub struct IngestLoop<B> {
    bus: B,
    topic: TopicFilter,
    rules: RedactionRuleSet,
    publisher: ShadowPublisher<B>,
    state_tx: watch::Sender<IngestState>,
}

impl<B: BusSession> IngestLoop<B> {
    pub fn new(
        bus: B,
        thing: &str,
        config: &IngestConfig,
        rules: RedactionRuleSet,
    ) -> Result<Self, CoreError> {
        let topic = TopicFilter::new(config.telemetry_topic.as_str())?;
        let publisher = ShadowPublisher::new(bus.clone(), thing, config.shadow_name.as_str());
        let (state_tx, _) = watch::channel(IngestState::Idle);

        Ok(Self {
            bus,
            topic,
            rules,
            publisher,
            state_tx,
        })
    }

    pub fn state(&self) -> IngestState {
        *self.state_tx.borrow()
    }

    /// Watch state transitions.
    pub fn subscribe_state(&self) -> watch::Receiver<IngestState> {
        self.state_tx.subscribe()
    }

    fn set_state(&self, state: IngestState) {
        let previous = self.state_tx.send_replace(state);
        if previous != state {
            debug!(from = %previous, to = %state, "ingest state changed");
        }
    }

    /// Run until the subscription ends or `cancel` fires.
    ///
    /// Only a failed subscribe is returned as an error; everything after
    /// that is handled per message.
    pub async fn run(&self, cancel: CancellationToken) -> Result<IngestState, CoreError> {
        self.set_state(IngestState::Subscribing);

        let mut subscription = match self.bus.subscribe(&self.topic).await {
            Ok(sub) => sub,
            Err(e) => {
                self.set_state(IngestState::Closed);
                return Err(CoreError::SubscribeFailure {
                    filter: self.topic.to_string(),
                    reason: e.to_string(),
                });
            }
        };
        self.set_state(IngestState::Active);
        info!(topic = %self.topic, shadow = self.publisher.shadow(), "telemetry ingest active");

        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                event = subscription.recv() => match event {
                    Some(BusEvent::Message(message)) => {
                        if let Err(e) = self.handle_message(&message).await {
                            warn!(topic = %message.topic, error = %e, "telemetry message dropped");
                        }
                    }
                    Some(BusEvent::StreamError(reason)) => {
                        let err = CoreError::StreamError {
                            filter: self.topic.to_string(),
                            reason,
                        };
                        error!(error = %err, "telemetry subscription degraded; not resubscribing");
                        self.set_state(IngestState::Degraded);
                    }
                    None => {
                        info!(topic = %self.topic, "telemetry subscription ended");
                        break;
                    }
                }
            }
        }

        self.set_state(IngestState::Closed);
        Ok(IngestState::Closed)
    }

    /// Parse, sanitize, and publish one telemetry message.
    pub async fn handle_message(&self, message: &BusMessage) -> Result<(), CoreError> {
        let raw = message
            .payload
            .to_json()
            .map_err(|e| CoreError::MalformedInput {
                reason: e.to_string(),
            })?;
        let state = self.rules.sanitize(&raw)?;
        self.publisher.publish(state).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use bytes::Bytes;
    use pitu_bus::{LocalBus, Payload};
    use pretty_assertions::assert_eq;
    use serde_json::{Value, json};

    use super::*;

    const THING: &str = "pitu-caleya";

    fn ingest(bus: &LocalBus) -> IngestLoop<LocalBus> {
        IngestLoop::new(
            bus.clone(),
            THING,
            &IngestConfig::default(),
            RedactionRuleSet::router_telemetry(),
        )
        .unwrap()
    }

    async fn wait_for(rx: &mut watch::Receiver<IngestState>, want: IngestState) {
        tokio::time::timeout(Duration::from_secs(5), rx.wait_for(|s| *s == want))
            .await
            .unwrap()
            .unwrap();
    }

    async fn reported(bus: &LocalBus) -> Option<Value> {
        let doc = bus.get_shadow(THING, "net-lte").await.ok()?;
        let doc: Value = serde_json::from_slice(&doc).unwrap();
        Some(doc["state"]["reported"].clone())
    }

    #[tokio::test]
    async fn publishes_sanitized_telemetry() {
        let bus = LocalBus::new();
        let ingest = ingest(&bus);

        ingest
            .handle_message(&BusMessage::new(
                "pitu/router/telemetry",
                Bytes::from_static(br#"{"sim":{"pin":"1234","puk":"0000"},"wwan":{"signal":-70}}"#),
            ))
            .await
            .unwrap();

        assert_eq!(reported(&bus).await, Some(json!({ "wwan": { "signal": -70 } })));
    }

    #[tokio::test]
    async fn malformed_message_keeps_loop_active() {
        let bus = LocalBus::new();
        let ingest = ingest(&bus);
        let mut state = ingest.subscribe_state();
        assert_eq!(ingest.state(), IngestState::Idle);

        let cancel = CancellationToken::new();
        let task = {
            let cancel = cancel.clone();
            async move { ingest.run(cancel).await }
        };
        let handle = tokio::spawn(task);
        wait_for(&mut state, IngestState::Active).await;

        bus.publish("pitu/router/telemetry", Payload::Binary(Bytes::from_static(b"{not json")))
            .await
            .unwrap();
        bus.publish("pitu/router/telemetry", Payload::Structured(json!([1, 2])))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(*state.borrow(), IngestState::Active);
        assert_eq!(bus.shadow_count(THING), 0);

        // A well-formed message after the bad ones still goes through.
        bus.publish("pitu/router/telemetry", Payload::Structured(json!({ "wwan": {} })))
            .await
            .unwrap();
        tokio::time::timeout(Duration::from_secs(5), async {
            while reported(&bus).await.is_none() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();

        cancel.cancel();
        assert_eq!(handle.await.unwrap().unwrap(), IngestState::Closed);
        assert_eq!(*state.borrow(), IngestState::Closed);
    }

    #[tokio::test]
    async fn stream_error_degrades_without_resubscribing() {
        let bus = LocalBus::new();
        let ingest = ingest(&bus);
        let mut state = ingest.subscribe_state();

        let cancel = CancellationToken::new();
        let handle = tokio::spawn({
            let cancel = cancel.clone();
            async move { ingest.run(cancel).await }
        });
        wait_for(&mut state, IngestState::Active).await;

        bus.report_stream_error("pitu/router/telemetry", "connection reset");
        wait_for(&mut state, IngestState::Degraded).await;
        assert_eq!(bus.active_subscriptions(), 1);

        // Messages still arriving on a degraded subscription are processed.
        bus.publish("pitu/router/telemetry", Payload::Structured(json!({ "a": 1 })))
            .await
            .unwrap();
        tokio::time::timeout(Duration::from_secs(5), async {
            while reported(&bus).await.is_none() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();

        cancel.cancel();
        handle.await.unwrap().unwrap();
        assert_eq!(bus.active_subscriptions(), 0);
    }

    #[tokio::test]
    async fn end_of_stream_closes() {
        let bus = LocalBus::new();
        let ingest = ingest(&bus);
        let mut state = ingest.subscribe_state();

        let handle = tokio::spawn(async move { ingest.run(CancellationToken::new()).await });
        wait_for(&mut state, IngestState::Active).await;

        bus.close();
        assert_eq!(handle.await.unwrap().unwrap(), IngestState::Closed);
    }

    #[tokio::test]
    async fn subscribe_failure_is_an_error() {
        let bus = LocalBus::new();
        bus.close();

        let err = ingest(&bus).run(CancellationToken::new()).await.unwrap_err();
        assert!(matches!(err, CoreError::SubscribeFailure { .. }));
    }
}
