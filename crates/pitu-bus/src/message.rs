// ── Bus message model ──
//
// A message on the bus carries either raw bytes or a structured JSON
// body. The encoding survives every hop; consumers that need a single
// representation call `Payload::to_text`.

use bytes::Bytes;
use serde_json::Value;

/// Wire framing a payload arrived with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum Encoding {
    Binary,
    Structured,
}

/// Body of a bus message.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// Opaque bytes, usually UTF-8 JSON produced by another component.
    Binary(Bytes),
    /// A JSON value the broker delivered already decoded.
    Structured(Value),
}

impl Payload {
    pub fn encoding(&self) -> Encoding {
        match self {
            Self::Binary(_) => Encoding::Binary,
            Self::Structured(_) => Encoding::Structured,
        }
    }

    /// Normalize the payload into text.
    ///
    /// Binary payloads are decoded as UTF-8 (invalid sequences replaced),
    /// structured payloads are rendered as compact JSON. Consumers never
    /// need to branch on the encoding after this.
    pub fn to_text(&self) -> String {
        match self {
            Self::Binary(bytes) => String::from_utf8_lossy(bytes).into_owned(),
            Self::Structured(value) => value.to_string(),
        }
    }

    /// Interpret the payload as JSON, parsing binary bodies.
    pub fn to_json(&self) -> Result<Value, serde_json::Error> {
        match self {
            Self::Binary(bytes) => serde_json::from_slice(bytes),
            Self::Structured(value) => Ok(value.clone()),
        }
    }
}

impl From<Value> for Payload {
    fn from(value: Value) -> Self {
        Self::Structured(value)
    }
}

impl From<Bytes> for Payload {
    fn from(bytes: Bytes) -> Self {
        Self::Binary(bytes)
    }
}

/// A message delivered by a subscription, tagged with the concrete topic
/// it was published on (never the filter that matched it).
#[derive(Debug, Clone, PartialEq)]
pub struct BusMessage {
    pub topic: String,
    pub payload: Payload,
}

impl BusMessage {
    pub fn new(topic: impl Into<String>, payload: impl Into<Payload>) -> Self {
        Self {
            topic: topic.into(),
            payload: payload.into(),
        }
    }
}

/// One item of a subscription stream.
///
/// End-of-stream is signalled by the subscription returning `None`.
#[derive(Debug, Clone, PartialEq)]
pub enum BusEvent {
    Message(BusMessage),
    /// The stream reported an error. The subscription is not torn down.
    StreamError(String),
}
