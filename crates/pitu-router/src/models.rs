// Router status model
//
// `/api/model.json` is a large, firmware-specific document. Only a handful
// of fields are read here; the rest travels untouched as telemetry.

use serde::Serialize;
use serde_json::Value;

/// Value of `wwan.connection` when the cellular link is up.
pub const CONNECTED: &str = "Connected";

/// The router's full status model, kept as raw JSON.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct RouterStatus(Value);

impl RouterStatus {
    pub fn new(raw: Value) -> Self {
        Self(raw)
    }

    /// `session.secToken`, required to post any form.
    pub fn session_token(&self) -> Option<&str> {
        self.0.pointer("/session/secToken").and_then(Value::as_str)
    }

    /// `wwan.connection`, e.g. `"Connected"` or `"Disconnected"`.
    pub fn wwan_connection(&self) -> Option<&str> {
        self.0.pointer("/wwan/connection").and_then(Value::as_str)
    }

    pub fn is_connected(&self) -> bool {
        self.wwan_connection() == Some(CONNECTED)
    }

    pub fn as_json(&self) -> &Value {
        &self.0
    }
}

/// Autoconnect modes accepted by `wwan.autoconnect`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Autoconnect {
    Never,
    HomeNetwork,
}

impl Autoconnect {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::Never => "Never",
            Self::HomeNetwork => "HomeNetwork",
        }
    }
}
