// ── Core error types ──
//
// Per-operation failures of the gateway. Transport-layer errors from the
// bus and the router client are translated into these at the seam, so
// callers reason about what failed rather than how.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Telemetry ────────────────────────────────────────────────────
    /// A telemetry message that is not a JSON object. Recoverable: the
    /// message is dropped and the loop continues.
    #[error("Malformed telemetry: {reason}")]
    MalformedInput { reason: String },

    // ── Bus operations ───────────────────────────────────────────────
    /// A shadow update or topic publish the bus rejected. Not retried.
    #[error("Publish to '{target}' failed: {reason}")]
    PublishFailure { target: String, reason: String },

    /// A get-shadow call failed.
    #[error("Fetching shadow '{shadow}' failed: {reason}")]
    FetchFailure { shadow: String, reason: String },

    /// Listing named shadows failed.
    #[error("Listing shadows of '{thing}' failed: {reason}")]
    ListFailure { thing: String, reason: String },

    /// Opening a subscription failed.
    #[error("Subscribing to '{filter}' failed: {reason}")]
    SubscribeFailure { filter: String, reason: String },

    /// A subscription reported a stream-level error. The subscription is
    /// left in place; nothing resubscribes.
    #[error("Stream error on '{filter}': {reason}")]
    StreamError { filter: String, reason: String },

    /// The bus session is gone.
    #[error("Bus unavailable: {reason}")]
    BusUnavailable { reason: String },

    // ── Client connections ───────────────────────────────────────────
    /// The client went away. Expected; triggers resource release.
    #[error("Client connection closed")]
    ConnectionClosed,

    #[error("Cannot listen on {addr}: {reason}")]
    Bind { addr: String, reason: String },

    #[error("WebSocket handshake with {peer} failed: {reason}")]
    Handshake { peer: String, reason: String },

    // ── Router ───────────────────────────────────────────────────────
    #[error("Router unreachable at {url}: {reason}")]
    RouterUnreachable { url: String, reason: String },

    #[error("Router authentication failed: {message}")]
    RouterAuthentication { message: String },

    #[error("Router error: {message}")]
    Router { message: String },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<pitu_bus::Error> for CoreError {
    fn from(err: pitu_bus::Error) -> Self {
        match err {
            pitu_bus::Error::Closed => CoreError::BusUnavailable {
                reason: "bus session closed".into(),
            },
            pitu_bus::Error::InvalidTopicFilter { filter, reason } => CoreError::Config {
                message: format!("invalid topic filter '{filter}': {reason}"),
            },
            pitu_bus::Error::ShadowNotFound { thing: _, shadow } => CoreError::FetchFailure {
                shadow,
                reason: "not found".into(),
            },
            pitu_bus::Error::InvalidDocument { message } => CoreError::PublishFailure {
                target: "shadow".into(),
                reason: message,
            },
            pitu_bus::Error::Rejected { message } => CoreError::PublishFailure {
                target: "bus".into(),
                reason: message,
            },
        }
    }
}

impl From<pitu_router::Error> for CoreError {
    fn from(err: pitu_router::Error) -> Self {
        match err {
            pitu_router::Error::Unreachable { url, reason } => {
                CoreError::RouterUnreachable { url, reason }
            }
            pitu_router::Error::Authentication { message } => {
                CoreError::RouterAuthentication { message }
            }
            pitu_router::Error::MissingToken => CoreError::RouterAuthentication {
                message: "no session token in status model".into(),
            },
            pitu_router::Error::Transport(ref e) if e.is_connect() => {
                CoreError::RouterUnreachable {
                    url: e
                        .url()
                        .map_or_else(|| "<unknown>".into(), ToString::to_string),
                    reason: e.to_string(),
                }
            }
            other => CoreError::Router {
                message: other.to_string(),
            },
        }
    }
}
