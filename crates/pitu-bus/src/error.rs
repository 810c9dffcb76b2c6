use thiserror::Error;

/// Top-level error type for the `pitu-bus` crate.
///
/// Covers every failure a bus session can report: the session itself
/// going away, malformed topic filters, and the shadow operations.
/// `pitu-core` maps these into per-operation failures.
#[derive(Debug, Error)]
pub enum Error {
    // ── Session ─────────────────────────────────────────────────────
    /// The bus session has been closed; no further calls can succeed.
    #[error("bus session closed")]
    Closed,

    // ── Topics ──────────────────────────────────────────────────────
    /// A subscription filter that is not a valid topic pattern.
    #[error("invalid topic filter '{filter}': {reason}")]
    InvalidTopicFilter { filter: String, reason: String },

    // ── Shadows ─────────────────────────────────────────────────────
    /// No shadow document exists for the requested (thing, name).
    #[error("shadow '{shadow}' not found for thing '{thing}'")]
    ShadowNotFound { thing: String, shadow: String },

    /// An update document that is not a JSON object with a `state` object.
    #[error("invalid shadow document: {message}")]
    InvalidDocument { message: String },

    /// The broker refused the request.
    #[error("request rejected by bus: {message}")]
    Rejected { message: String },
}

impl Error {
    /// Returns `true` if this is a "not found" error.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::ShadowNotFound { .. })
    }
}
