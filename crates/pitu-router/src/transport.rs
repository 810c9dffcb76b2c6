// Shared transport configuration for building the router's reqwest::Client.
//
// The router's web UI keys its session on a cookie, so every client gets a
// cookie jar. Redirects are followed because form posts report success or
// failure purely through where they land.

use std::sync::Arc;
use std::time::Duration;

use reqwest::cookie::Jar;
use reqwest::redirect::Policy;

use crate::error::Error;

const MAX_REDIRECTS: usize = 5;

/// Shared transport configuration for building HTTP clients.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub timeout: Duration,
    pub cookie_jar: Arc<Jar>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(3),
            cookie_jar: Arc::new(Jar::default()),
        }
    }
}

impl TransportConfig {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Build a `reqwest::Client` from this config.
    pub fn build_client(&self) -> Result<reqwest::Client, Error> {
        let client = reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent(concat!("pitu-router/", env!("CARGO_PKG_VERSION")))
            .cookie_provider(Arc::clone(&self.cookie_jar))
            .redirect(Policy::limited(MAX_REDIRECTS))
            .build()?;
        Ok(client)
    }
}
