use thiserror::Error;

/// Top-level error type for the `pitu-router` crate.
///
/// `pitu-core` decides which of these end a polling iteration and which
/// are fatal at startup.
#[derive(Debug, Error)]
pub enum Error {
    // ── Reachability ────────────────────────────────────────────────
    /// The router did not answer the session probe with HTTP 200.
    #[error("router unreachable at {url}: {reason}")]
    Unreachable { url: String, reason: String },

    // ── Authentication ──────────────────────────────────────────────
    /// The login form was rejected (usually a wrong password).
    #[error("router login failed: {message}")]
    Authentication { message: String },

    /// The status model did not carry a session token.
    #[error("router status model has no session token")]
    MissingToken,

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, timeout, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// A form post landed somewhere other than its success page.
    #[error("{action} redirected to {landed} instead of {expected}")]
    UnexpectedRedirect {
        action: &'static str,
        expected: String,
        landed: String,
    },

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}
