// ── Runtime gateway configuration ──
//
// These types describe *what* the gateway bridges and *where* it listens.
// They are resolved once at startup and never touch disk; the binary
// builds a `GatewayConfig` (via pitu-config) and hands it in.

use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

use secrecy::SecretString;
use url::Url;

/// Device identity all shadows and topics are scoped to.
pub const DEFAULT_THING_NAME: &str = "pitu-caleya";
/// Topic the router poller publishes raw telemetry on.
pub const DEFAULT_TELEMETRY_TOPIC: &str = "pitu/router/telemetry";
/// Shadow the sanitized telemetry is reported into.
pub const DEFAULT_TELEMETRY_SHADOW: &str = "net-lte";
pub const DEFAULT_BRIDGE_PORT: u16 = 9999;

/// Telemetry ingest settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestConfig {
    pub telemetry_topic: String,
    pub shadow_name: String,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            telemetry_topic: DEFAULT_TELEMETRY_TOPIC.into(),
            shadow_name: DEFAULT_TELEMETRY_SHADOW.into(),
        }
    }
}

/// Shadow bridge server settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeConfig {
    pub listen_addr: SocketAddr,
    /// Spacing between consecutive shadows of the initial sync burst.
    pub sync_interval: Duration,
    /// Page size for named-shadow listings.
    pub list_page_size: u32,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from((Ipv4Addr::UNSPECIFIED, DEFAULT_BRIDGE_PORT)),
            sync_interval: Duration::from_secs(1),
            list_page_size: 100,
        }
    }
}

/// Router telemetry poller settings.
#[derive(Debug, Clone)]
pub struct PollerConfig {
    pub router_url: Url,
    pub password: SecretString,
    pub poll_interval: Duration,
    /// Pause after a failed iteration before trying again.
    pub retry_delay: Duration,
    /// Per-request HTTP timeout.
    pub timeout: Duration,
    /// Bounce the cellular link when it reports disconnected.
    pub reconnect_on_disconnect: bool,
}

impl PollerConfig {
    pub fn new(router_url: Url, password: SecretString) -> Self {
        Self {
            router_url,
            password,
            poll_interval: Duration::from_secs(30),
            retry_delay: Duration::from_secs(2),
            timeout: Duration::from_secs(10),
            reconnect_on_disconnect: false,
        }
    }
}

/// Everything the gateway process runs with.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub thing_name: String,
    pub ingest: IngestConfig,
    pub bridge: BridgeConfig,
    /// `None` disables the router poller; telemetry must then come from
    /// another publisher on the bus.
    pub poller: Option<PollerConfig>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            thing_name: DEFAULT_THING_NAME.into(),
            ingest: IngestConfig::default(),
            bridge: BridgeConfig::default(),
            poller: None,
        }
    }
}
