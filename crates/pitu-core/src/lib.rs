// pitu-core: Telemetry sanitizing and the real-time shadow bridge between
// the local bus and UI clients.

pub mod bridge;
pub mod config;
pub mod error;
pub mod gateway;
pub mod ingest;
pub mod poller;
pub mod publisher;
pub mod sanitize;
pub mod sync;

// ── Primary re-exports ──────────────────────────────────────────────
pub use bridge::{BridgeServer, ClientSink, OutboundEvent};
pub use config::{BridgeConfig, GatewayConfig, IngestConfig, PollerConfig};
pub use error::CoreError;
pub use gateway::Gateway;
pub use ingest::{IngestLoop, IngestState};
pub use poller::TelemetryPoller;
pub use publisher::{ShadowPublisher, publish_shadow};
pub use sanitize::{RedactionPath, RedactionRuleSet};
pub use sync::PacedSync;
