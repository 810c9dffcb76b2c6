// ── Router telemetry poller ──
//
// Logs into the cellular router, reads its full status model, and
// publishes it as raw bytes on the telemetry topic for the ingest loop to
// sanitize. Runs on a fixed cadence with a short retry delay after any
// failed iteration.

use std::time::Duration;

use bytes::Bytes;
use secrecy::SecretString;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use pitu_bus::{BusSession, Payload};
use pitu_router::{RouterClient, RouterStatus, TransportConfig};

use crate::config::PollerConfig;
use crate::error::CoreError;

pub struct TelemetryPoller<B> {
    bus: B,
    client: RouterClient,
    password: SecretString,
    topic: String,
    poll_interval: Duration,
    retry_delay: Duration,
    reconnect_on_disconnect: bool,
}

impl<B: BusSession> TelemetryPoller<B> {
    pub fn new(bus: B, topic: impl Into<String>, config: &PollerConfig) -> Result<Self, CoreError> {
        let transport = TransportConfig::default().with_timeout(config.timeout);
        let client = RouterClient::new(config.router_url.clone(), &transport)?;

        Ok(Self {
            bus,
            client,
            password: config.password.clone(),
            topic: topic.into(),
            poll_interval: config.poll_interval,
            retry_delay: config.retry_delay,
            reconnect_on_disconnect: config.reconnect_on_disconnect,
        })
    }

    /// Poll until `cancel` fires.
    ///
    /// A router that does not answer the first probe is fatal; the
    /// process supervisor is expected to restart the poller later.
    /// Failures after that are retried after `retry_delay`.
    pub async fn run(&self, cancel: CancellationToken) -> Result<(), CoreError> {
        self.client.probe().await?;
        info!(router = %self.client.base_url(), topic = self.topic, "router poller started");

        loop {
            let delay = match self.poll_once().await {
                Ok(_) => self.poll_interval,
                Err(e) => {
                    warn!(error = %e, retry_in_ms = self.retry_delay.as_millis(), "router poll failed");
                    self.retry_delay
                }
            };

            tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                () = tokio::time::sleep(delay) => {}
            }
        }

        debug!("router poller stopped");
        Ok(())
    }

    /// One iteration: log in, read status, publish, and optionally bounce
    /// a disconnected link.
    pub async fn poll_once(&self) -> Result<RouterStatus, CoreError> {
        self.client.login(&self.password).await?;
        let status = self.client.status().await?;

        let body = serde_json::to_vec(status.as_json()).map_err(|e| CoreError::Router {
            message: format!("cannot encode status model: {e}"),
        })?;
        let len = body.len();
        self.bus
            .publish(&self.topic, Payload::Binary(Bytes::from(body)))
            .await
            .map_err(|e| CoreError::PublishFailure {
                target: self.topic.clone(),
                reason: e.to_string(),
            })?;
        debug!(topic = self.topic, bytes = len, "router telemetry published");

        if status.is_connected() {
            debug!("cellular link connected");
        } else {
            let link = status.wwan_connection().unwrap_or("unknown");
            warn!(link, "cellular link not connected");
            if self.reconnect_on_disconnect {
                self.client.reconnect().await?;
                info!("cellular link reconnect requested");
            }
        }

        Ok(status)
    }
}
