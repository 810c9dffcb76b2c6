// ── Gateway ──
//
// Wires the ingest loop, the shadow bridge, and the optional router
// poller onto one shared bus session and owns their task lifecycle.

use std::net::SocketAddr;

use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use pitu_bus::BusSession;

use crate::bridge::BridgeServer;
use crate::config::GatewayConfig;
use crate::error::CoreError;
use crate::ingest::IngestLoop;
use crate::poller::TelemetryPoller;
use crate::sanitize::RedactionRuleSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
enum Component {
    Ingest,
    Bridge,
    Poller,
}

/// A running gateway.
///
/// Created by [`start`](Self::start); finishes when [`shutdown`](Self::shutdown)
/// is called (or the token passed to `start` fires) and every component
/// has released its resources.
pub struct Gateway {
    cancel: CancellationToken,
    bridge_addr: SocketAddr,
    tasks: JoinSet<(Component, Result<(), CoreError>)>,
}

impl Gateway {
    /// Bind the bridge and spawn every component.
    ///
    /// Bad topic configuration and an unbindable listen address are
    /// startup failures and returned here.
    pub async fn start<B: BusSession>(
        bus: B,
        config: &GatewayConfig,
        cancel: CancellationToken,
    ) -> Result<Self, CoreError> {
        let ingest = IngestLoop::new(
            bus.clone(),
            &config.thing_name,
            &config.ingest,
            RedactionRuleSet::router_telemetry(),
        )?;
        let bridge = BridgeServer::bind(bus.clone(), config.thing_name.as_str(), &config.bridge).await?;
        let bridge_addr = bridge.local_addr()?;
        let poller = config
            .poller
            .as_ref()
            .map(|p| TelemetryPoller::new(bus.clone(), config.ingest.telemetry_topic.as_str(), p))
            .transpose()?;

        let mut tasks = JoinSet::new();
        let token = cancel.clone();
        tasks.spawn(async move {
            let result = ingest.run(token).await.map(|state| {
                debug!(%state, "ingest loop finished");
            });
            (Component::Ingest, result)
        });
        let token = cancel.clone();
        tasks.spawn(async move { (Component::Bridge, bridge.serve(token).await) });
        if let Some(poller) = poller {
            let token = cancel.clone();
            tasks.spawn(async move { (Component::Poller, poller.run(token).await) });
        } else {
            info!("router poller disabled");
        }

        info!(thing = config.thing_name, bridge = %bridge_addr, "gateway started");
        Ok(Self {
            cancel,
            bridge_addr,
            tasks,
        })
    }

    pub fn bridge_addr(&self) -> SocketAddr {
        self.bridge_addr
    }

    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    /// Wait for every component to stop.
    ///
    /// A poller failure is logged and leaves the rest running. Any other
    /// component failing shuts the gateway down and its error is returned.
    pub async fn wait(mut self) -> Result<(), CoreError> {
        let mut outcome = Ok(());

        while let Some(joined) = self.tasks.join_next().await {
            match joined {
                Ok((component, Ok(()))) => debug!(%component, "component stopped"),
                Ok((Component::Poller, Err(e))) => {
                    error!(error = %e, "router poller stopped; bridge keeps running");
                }
                Ok((component, Err(e))) => {
                    error!(%component, error = %e, "component failed; shutting down");
                    self.cancel.cancel();
                    if outcome.is_ok() {
                        outcome = Err(e);
                    }
                }
                Err(e) => {
                    error!(error = %e, "component task panicked; shutting down");
                    self.cancel.cancel();
                }
            }
        }

        info!("gateway stopped");
        outcome
    }
}
