// ── Wire protocol ──
//
// Both directions use text frames holding `{"event": <name>, "data": ...}`.
// Server-to-client `data` is always a string: binary bus payloads are
// decoded as UTF-8 and structured ones are sent as their compact JSON form,
// so clients never branch on bus framing.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use pitu_bus::{BusMessage, Payload};

use crate::error::CoreError;

/// Event name prefix for the initial shadow sync burst.
pub const SHADOW_SYNC_PREFIX: &str = "shadows:";

/// A server-to-client event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundEvent {
    pub event: String,
    pub data: String,
}

impl OutboundEvent {
    pub fn new(event: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            event: event.into(),
            data: data.into(),
        }
    }

    /// `shadows:<name>` carrying a raw shadow document.
    pub fn shadow_sync(shadow: &str, document: &Bytes) -> Self {
        Self::new(
            format!("{SHADOW_SYNC_PREFIX}{shadow}"),
            String::from_utf8_lossy(document),
        )
    }

    /// A relayed bus message, named by its topic.
    pub fn relay(message: &BusMessage) -> Self {
        Self::new(message.topic.clone(), message.payload.to_text())
    }

    pub fn to_frame(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// A client-to-server event. Any name is accepted and published on the
/// bus as a topic of the same name.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ClientFrame {
    pub event: String,
    #[serde(default)]
    pub data: Value,
}

impl ClientFrame {
    pub fn parse(text: &str) -> Result<Self, CoreError> {
        let frame: Self = serde_json::from_str(text).map_err(|e| CoreError::MalformedInput {
            reason: format!("client frame: {e}"),
        })?;
        if frame.event.is_empty() {
            return Err(CoreError::MalformedInput {
                reason: "client frame has an empty event name".into(),
            });
        }
        Ok(frame)
    }

    /// Split into the publish topic and a structured payload.
    pub fn into_publish(self) -> (String, Payload) {
        (self.event, Payload::Structured(self.data))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn binary_and_structured_relay_to_the_same_text() {
        let binary = BusMessage::new("a/b", Bytes::from_static(br#"{"x":1}"#));
        let structured = BusMessage::new("a/b", json!({ "x": 1 }));

        assert_eq!(OutboundEvent::relay(&binary), OutboundEvent::relay(&structured));
        assert_eq!(OutboundEvent::relay(&binary).data, r#"{"x":1}"#);
    }

    #[test]
    fn shadow_sync_event_name() {
        let event = OutboundEvent::shadow_sync("net-lte", &Bytes::from_static(b"{}"));
        assert_eq!(event.event, "shadows:net-lte");
        assert_eq!(
            event.to_frame().unwrap(),
            r#"{"event":"shadows:net-lte","data":"{}"}"#
        );
    }

    #[test]
    fn parses_client_frames() {
        let frame = ClientFrame::parse(r#"{"event":"ui/refresh","data":{"all":true}}"#).unwrap();
        let (topic, payload) = frame.into_publish();
        assert_eq!(topic, "ui/refresh");
        assert_eq!(payload, Payload::Structured(json!({ "all": true })));

        let bare = ClientFrame::parse(r#"{"event":"ping"}"#).unwrap();
        assert_eq!(bare.data, Value::Null);
    }

    #[test]
    fn rejects_bad_client_frames() {
        assert!(ClientFrame::parse("hello").is_err());
        assert!(ClientFrame::parse(r#"{"data":1}"#).is_err());
        assert!(ClientFrame::parse(r#"{"event":"","data":1}"#).is_err());
    }
}
