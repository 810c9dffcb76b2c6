// ── Shadow publisher ──
//
// Reports a state object into a named shadow by wrapping it as
// `{"state": {"reported": <state>}}`. The bus replaces the shadow's
// reported section wholesale; stale keys do not survive an update.

use bytes::Bytes;
use serde_json::{Value, json};
use tracing::debug;

use pitu_bus::BusSession;

use crate::error::CoreError;

/// Report `state` into `thing`'s named shadow `shadow`.
///
/// Fails with [`CoreError::PublishFailure`] when the bus rejects the
/// update. Not retried.
pub async fn publish_shadow<B: BusSession>(
    bus: &B,
    thing: &str,
    shadow: &str,
    state: Value,
) -> Result<(), CoreError> {
    let document = json!({ "state": { "reported": state } });
    let bytes = Bytes::from(document.to_string());
    let len = bytes.len();

    bus.update_shadow(thing, shadow, bytes)
        .await
        .map_err(|e| CoreError::PublishFailure {
            target: format!("{thing}/{shadow}"),
            reason: e.to_string(),
        })?;

    debug!(thing, shadow, bytes = len, "shadow updated");
    Ok(())
}

/// A [`publish_shadow`] bound to one thing and shadow.
#[derive(Debug, Clone)]
pub struct ShadowPublisher<B> {
    bus: B,
    thing: String,
    shadow: String,
}

impl<B: BusSession> ShadowPublisher<B> {
    pub fn new(bus: B, thing: impl Into<String>, shadow: impl Into<String>) -> Self {
        Self {
            bus,
            thing: thing.into(),
            shadow: shadow.into(),
        }
    }

    pub fn shadow(&self) -> &str {
        &self.shadow
    }

    pub async fn publish(&self, state: Value) -> Result<(), CoreError> {
        publish_shadow(&self.bus, &self.thing, &self.shadow, state).await
    }
}
