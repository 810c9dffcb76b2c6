//! CLI error types with miette diagnostics.
//!
//! Maps core and config errors into user-facing errors with actionable
//! help text and stable exit codes.

use miette::Diagnostic;
use thiserror::Error;

use pitu_config::ConfigError;
use pitu_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const CONNECTION: i32 = 7;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Router ───────────────────────────────────────────────────────

    #[error("Could not reach the router at {url}: {reason}")]
    #[diagnostic(
        code(pitu::router_unreachable),
        help(
            "Check that the router is powered and reachable from this host.\n\
             Configured URL: {url} (router.url)"
        )
    )]
    RouterUnreachable { url: String, reason: String },

    #[error("Router login failed: {message}")]
    #[diagnostic(
        code(pitu::auth_failed),
        help("Verify the router admin password. Store it with: pitu config set-password")
    )]
    AuthFailed { message: String },

    #[error("No router password configured")]
    #[diagnostic(
        code(pitu::no_credentials),
        help(
            "Set PITU_ROUTER_PASSWORD, run `pitu config set-password`,\n\
             or start with --no-poller to skip the router."
        )
    )]
    NoCredentials,

    // ── Gateway ──────────────────────────────────────────────────────

    #[error("Cannot listen on {addr}: {reason}")]
    #[diagnostic(
        code(pitu::bind_failed),
        help("Choose another address with --listen or bridge.listen.")
    )]
    Bind { addr: String, reason: String },

    #[error("Gateway failed: {message}")]
    #[diagnostic(code(pitu::gateway))]
    Gateway { message: String },

    // ── Input ────────────────────────────────────────────────────────

    #[error("Malformed telemetry: {reason}")]
    #[diagnostic(
        code(pitu::malformed_input),
        help("The input must be a single JSON object.")
    )]
    MalformedInput { reason: String },

    // ── Validation / configuration ───────────────────────────────────

    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(pitu::validation))]
    Validation { field: String, reason: String },

    #[error("Config file already exists at {path}")]
    #[diagnostic(code(pitu::config_exists), help("Pass --force to overwrite it."))]
    ConfigExists { path: String },

    #[error(transparent)]
    #[diagnostic(code(pitu::config))]
    Config(Box<figment::Error>),

    // ── IO / Serialization ───────────────────────────────────────────

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("JSON encoding failed: {0}")]
    #[diagnostic(code(pitu::json))]
    Json(#[from] serde_json::Error),
}

impl From<figment::Error> for CliError {
    fn from(err: figment::Error) -> Self {
        Self::Config(Box::new(err))
    }
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::RouterUnreachable { .. } => exit_code::CONNECTION,
            Self::AuthFailed { .. } | Self::NoCredentials => exit_code::AUTH,
            Self::Validation { .. }
            | Self::MalformedInput { .. }
            | Self::ConfigExists { .. }
            | Self::Config(_) => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            ConfigError::NoCredentials => CliError::NoCredentials,
            ConfigError::Figment(e) => CliError::Config(e),
            ConfigError::Io(e) => CliError::Io(e),
            ConfigError::Serialization(e) => CliError::Validation {
                field: "config".into(),
                reason: e.to_string(),
            },
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::RouterUnreachable { url, reason } => {
                CliError::RouterUnreachable { url, reason }
            }
            CoreError::RouterAuthentication { message } => CliError::AuthFailed { message },
            CoreError::Bind { addr, reason } => CliError::Bind { addr, reason },
            CoreError::MalformedInput { reason } => CliError::MalformedInput { reason },
            CoreError::Config { message } => CliError::Validation {
                field: "config".into(),
                reason: message,
            },
            other => CliError::Gateway {
                message: other.to_string(),
            },
        }
    }
}

impl From<pitu_router::Error> for CliError {
    fn from(err: pitu_router::Error) -> Self {
        CoreError::from(err).into()
    }
}
