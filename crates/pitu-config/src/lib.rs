//! Configuration for the pitu gateway.
//!
//! A TOML file, overlaid by `PITU_`-prefixed environment variables, with
//! router password resolution (env + keyring + plaintext) and translation
//! to `pitu_core::GatewayConfig`.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use pitu_core::config::{
    DEFAULT_BRIDGE_PORT, DEFAULT_TELEMETRY_SHADOW, DEFAULT_TELEMETRY_TOPIC, DEFAULT_THING_NAME,
};
use pitu_core::{BridgeConfig, GatewayConfig, IngestConfig, PollerConfig};

/// Environment variable checked first for the router password.
pub const PASSWORD_ENV: &str = "PITU_ROUTER_PASSWORD";
const KEYRING_SERVICE: &str = "pitu";
const KEYRING_USER: &str = "router/password";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no router password configured (set {PASSWORD_ENV}, the keyring, or router.password)")]
    NoCredentials,

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Config {
    /// Device identity every shadow and topic is scoped to.
    #[serde(default = "default_thing_name")]
    pub thing_name: String,

    #[serde(default)]
    pub telemetry: Telemetry,

    #[serde(default)]
    pub bridge: Bridge,

    #[serde(default)]
    pub router: Router,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            thing_name: default_thing_name(),
            telemetry: Telemetry::default(),
            bridge: Bridge::default(),
            router: Router::default(),
        }
    }
}

fn default_thing_name() -> String {
    DEFAULT_THING_NAME.into()
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Telemetry {
    /// Topic raw router telemetry arrives on.
    #[serde(default = "default_topic")]
    pub topic: String,

    /// Shadow the sanitized telemetry is reported into.
    #[serde(default = "default_shadow")]
    pub shadow: String,
}

impl Default for Telemetry {
    fn default() -> Self {
        Self {
            topic: default_topic(),
            shadow: default_shadow(),
        }
    }
}

fn default_topic() -> String {
    DEFAULT_TELEMETRY_TOPIC.into()
}
fn default_shadow() -> String {
    DEFAULT_TELEMETRY_SHADOW.into()
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Bridge {
    /// Websocket listen address.
    #[serde(default = "default_listen")]
    pub listen: String,

    /// Spacing of the initial shadow sync, in milliseconds.
    #[serde(default = "default_sync_interval_ms")]
    pub sync_interval_ms: u64,

    #[serde(default = "default_page_size")]
    pub list_page_size: u32,
}

impl Default for Bridge {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            sync_interval_ms: default_sync_interval_ms(),
            list_page_size: default_page_size(),
        }
    }
}

fn default_listen() -> String {
    format!("0.0.0.0:{DEFAULT_BRIDGE_PORT}")
}
fn default_sync_interval_ms() -> u64 {
    1000
}
fn default_page_size() -> u32 {
    100
}

/// The cellular router polled for telemetry.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Router {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Router web UI base URL.
    #[serde(default = "default_router_url")]
    pub url: String,

    /// Admin password (plaintext; prefer the keyring or env var).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    /// Environment variable holding the password, checked before
    /// `PITU_ROUTER_PASSWORD`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_env: Option<String>,

    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,

    #[serde(default = "default_retry_delay")]
    pub retry_delay_secs: u64,

    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Bounce the cellular link when the router reports it down.
    #[serde(default)]
    pub reconnect_on_disconnect: bool,
}

impl Default for Router {
    fn default() -> Self {
        Self {
            enabled: true,
            url: default_router_url(),
            password: None,
            password_env: None,
            poll_interval_secs: default_poll_interval(),
            retry_delay_secs: default_retry_delay(),
            timeout_secs: default_timeout(),
            reconnect_on_disconnect: false,
        }
    }
}

fn default_true() -> bool {
    true
}
fn default_router_url() -> String {
    "http://192.168.1.1".into()
}
fn default_poll_interval() -> u64 {
    30
}
fn default_retry_delay() -> u64 {
    2
}
fn default_timeout() -> u64 {
    10
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("org", "pitu", "pitu").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("pitu");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load config from the canonical path plus environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load config from `path` plus environment. A missing file yields the
/// defaults; nested keys use `__`, e.g. `PITU_BRIDGE__LISTEN`.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("PITU_").split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

// ── Config saving ───────────────────────────────────────────────────

/// Render config as TOML with any plaintext password masked.
pub fn render_config(cfg: &Config) -> Result<String, ConfigError> {
    let mut shown = cfg.clone();
    if shown.router.password.is_some() {
        shown.router.password = Some("********".into());
    }
    Ok(toml::to_string_pretty(&shown)?)
}

/// Write config as TOML to `path`, creating parent directories.
pub fn save_config(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Credential resolution ───────────────────────────────────────────

/// Resolve the router password: env var, then system keyring, then
/// plaintext in config.
pub fn resolve_router_password(router: &Router) -> Result<SecretString, ConfigError> {
    resolve_password_with(router, || {
        keyring::Entry::new(KEYRING_SERVICE, KEYRING_USER)
            .and_then(|entry| entry.get_password())
            .ok()
    })
}

fn resolve_password_with(
    router: &Router,
    keyring: impl FnOnce() -> Option<String>,
) -> Result<SecretString, ConfigError> {
    // 1. Env vars
    let env_names = router.password_env.as_deref().into_iter().chain([PASSWORD_ENV]);
    for name in env_names {
        if let Ok(pw) = std::env::var(name) {
            return Ok(SecretString::from(pw));
        }
    }

    // 2. Keyring
    if let Some(pw) = keyring() {
        return Ok(SecretString::from(pw));
    }

    // 3. Plaintext in config
    if let Some(ref pw) = router.password {
        return Ok(SecretString::from(pw.clone()));
    }

    Err(ConfigError::NoCredentials)
}

/// Store the router password in the system keyring.
pub fn store_router_password(password: &str) -> Result<(), ConfigError> {
    keyring::Entry::new(KEYRING_SERVICE, KEYRING_USER)
        .and_then(|entry| entry.set_password(password))
        .map_err(|e| ConfigError::Validation {
            field: "keyring".into(),
            reason: e.to_string(),
        })
}

// ── Translation to runtime config ───────────────────────────────────

/// Build the gateway's runtime config.
///
/// The router password is only resolved when `with_poller` is set and
/// the router section is enabled.
pub fn to_gateway_config(cfg: &Config, with_poller: bool) -> Result<GatewayConfig, ConfigError> {
    to_gateway_config_with(cfg, with_poller, resolve_router_password)
}

fn to_gateway_config_with(
    cfg: &Config,
    with_poller: bool,
    password: impl FnOnce(&Router) -> Result<SecretString, ConfigError>,
) -> Result<GatewayConfig, ConfigError> {
    require_non_empty("thing_name", &cfg.thing_name)?;
    require_non_empty("telemetry.topic", &cfg.telemetry.topic)?;
    require_non_empty("telemetry.shadow", &cfg.telemetry.shadow)?;

    let listen_addr: SocketAddr = cfg.bridge.listen.parse().map_err(|_| ConfigError::Validation {
        field: "bridge.listen".into(),
        reason: format!("expected host:port, got '{}'", cfg.bridge.listen),
    })?;
    if cfg.bridge.list_page_size == 0 {
        return Err(ConfigError::Validation {
            field: "bridge.list_page_size".into(),
            reason: "must be at least 1".into(),
        });
    }

    let poller = if with_poller && cfg.router.enabled {
        Some(to_poller_config(&cfg.router, password)?)
    } else {
        None
    };

    Ok(GatewayConfig {
        thing_name: cfg.thing_name.clone(),
        ingest: IngestConfig {
            telemetry_topic: cfg.telemetry.topic.clone(),
            shadow_name: cfg.telemetry.shadow.clone(),
        },
        bridge: BridgeConfig {
            listen_addr,
            sync_interval: Duration::from_millis(cfg.bridge.sync_interval_ms),
            list_page_size: cfg.bridge.list_page_size,
        },
        poller,
    })
}

fn to_poller_config(
    router: &Router,
    password: impl FnOnce(&Router) -> Result<SecretString, ConfigError>,
) -> Result<PollerConfig, ConfigError> {
    let url = router_url(router)?;
    let mut poller = PollerConfig::new(url, password(router)?);
    poller.poll_interval = Duration::from_secs(router.poll_interval_secs);
    poller.retry_delay = Duration::from_secs(router.retry_delay_secs);
    poller.timeout = Duration::from_secs(router.timeout_secs);
    poller.reconnect_on_disconnect = router.reconnect_on_disconnect;
    Ok(poller)
}

/// Parse and check the router URL.
pub fn router_url(router: &Router) -> Result<url::Url, ConfigError> {
    router.url.parse().map_err(|_| ConfigError::Validation {
        field: "router.url".into(),
        reason: format!("invalid URL: {}", router.url),
    })
}

fn require_non_empty(field: &str, value: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::Validation {
            field: field.into(),
            reason: "must not be empty".into(),
        });
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use figment::Jail;
    use pretty_assertions::assert_eq;
    use secrecy::ExposeSecret;

    fn no_password(_: &Router) -> Result<SecretString, ConfigError> {
        Err(ConfigError::NoCredentials)
    }

    #[test]
    fn defaults_without_file() {
        Jail::expect_with(|jail| {
            let cfg = load_config_from(&jail.directory().join("missing.toml")).unwrap();
            assert_eq!(cfg, Config::default());
            assert_eq!(cfg.thing_name, "pitu-caleya");
            assert_eq!(cfg.bridge.listen, "0.0.0.0:9999");
            Ok(())
        });
    }

    #[test]
    fn file_then_env_override() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "config.toml",
                r#"
                thing_name = "rv-1"

                [bridge]
                listen = "127.0.0.1:8080"
                sync_interval_ms = 250

                [router]
                url = "http://10.0.0.1"
                "#,
            )?;
            jail.set_env("PITU_BRIDGE__LIST_PAGE_SIZE", "25");
            jail.set_env("PITU_TELEMETRY__SHADOW", "lte");

            let cfg = load_config_from(&jail.directory().join("config.toml")).unwrap();
            assert_eq!(cfg.thing_name, "rv-1");
            assert_eq!(cfg.bridge.listen, "127.0.0.1:8080");
            assert_eq!(cfg.bridge.sync_interval_ms, 250);
            assert_eq!(cfg.bridge.list_page_size, 25);
            assert_eq!(cfg.telemetry.shadow, "lte");
            assert_eq!(cfg.telemetry.topic, "pitu/router/telemetry");
            assert_eq!(cfg.router.url, "http://10.0.0.1");
            Ok(())
        });
    }

    #[test]
    fn password_env_wins_over_plaintext() {
        Jail::expect_with(|jail| {
            jail.set_env("ROUTER_PW", "from-env");
            let router = Router {
                password: Some("plain".into()),
                password_env: Some("ROUTER_PW".into()),
                ..Router::default()
            };
            let pw = resolve_password_with(&router, || None).unwrap();
            assert_eq!(pw.expose_secret(), "from-env");
            Ok(())
        });
    }

    #[test]
    fn keyring_then_plaintext() {
        Jail::expect_with(|_| {
            let router = Router {
                password: Some("plain".into()),
                ..Router::default()
            };
            let pw = resolve_password_with(&router, || Some("from-keyring".into())).unwrap();
            assert_eq!(pw.expose_secret(), "from-keyring");

            let pw = resolve_password_with(&router, || None).unwrap();
            assert_eq!(pw.expose_secret(), "plain");

            let err = resolve_password_with(&Router::default(), || None).unwrap_err();
            assert!(matches!(err, ConfigError::NoCredentials));
            Ok(())
        });
    }

    #[test]
    fn translates_to_gateway_config() {
        let cfg = Config {
            bridge: Bridge {
                listen: "127.0.0.1:9000".into(),
                sync_interval_ms: 500,
                list_page_size: 10,
            },
            ..Config::default()
        };
        let gateway = to_gateway_config_with(&cfg, true, |_| Ok(SecretString::from("pw".to_owned())))
            .unwrap();

        assert_eq!(gateway.thing_name, "pitu-caleya");
        assert_eq!(gateway.bridge.listen_addr, "127.0.0.1:9000".parse().unwrap());
        assert_eq!(gateway.bridge.sync_interval, Duration::from_millis(500));
        assert_eq!(gateway.ingest.shadow_name, "net-lte");

        let poller = gateway.poller.unwrap();
        assert_eq!(poller.router_url.as_str(), "http://192.168.1.1/");
        assert_eq!(poller.poll_interval, Duration::from_secs(30));
        assert_eq!(poller.retry_delay, Duration::from_secs(2));
    }

    #[test]
    fn poller_skipped_without_resolving_password() {
        let gateway = to_gateway_config_with(&Config::default(), false, no_password).unwrap();
        assert!(gateway.poller.is_none());

        let mut cfg = Config::default();
        cfg.router.enabled = false;
        let gateway = to_gateway_config_with(&cfg, true, no_password).unwrap();
        assert!(gateway.poller.is_none());
    }

    #[test]
    fn rejects_invalid_values() {
        let mut cfg = Config::default();
        cfg.bridge.listen = "nowhere".into();
        let err = to_gateway_config_with(&cfg, false, no_password).unwrap_err();
        assert!(matches!(err, ConfigError::Validation { ref field, .. } if field == "bridge.listen"));

        let mut cfg = Config::default();
        cfg.bridge.list_page_size = 0;
        assert!(to_gateway_config_with(&cfg, false, no_password).is_err());

        let mut cfg = Config::default();
        cfg.thing_name = " ".into();
        assert!(to_gateway_config_with(&cfg, false, no_password).is_err());

        let mut cfg = Config::default();
        cfg.router.url = "not a url".into();
        let err = to_gateway_config_with(&cfg, true, |_| Ok(SecretString::from(String::new())))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Validation { ref field, .. } if field == "router.url"));
    }

    #[test]
    fn rendered_config_masks_password_and_round_trips() {
        let mut cfg = Config::default();
        cfg.router.password = Some("hunter2".into());

        let rendered = render_config(&cfg).unwrap();
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("thing_name = \"pitu-caleya\""));

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        save_config(&cfg, &path).unwrap();
        let loaded: Config = toml::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(loaded, cfg);
    }
}
