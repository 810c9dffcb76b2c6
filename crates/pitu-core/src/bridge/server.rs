use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{info, warn};

use pitu_bus::BusSession;
use pitu_bus::shadow::update_accepted_filter;

use super::connection::{self, ConnectionContext};
use crate::config::BridgeConfig;
use crate::error::CoreError;

/// Pause after a failed accept, so a persistent error does not spin.
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// Websocket server mirroring named-shadow updates to UI clients.
pub struct BridgeServer<B> {
    listener: TcpListener,
    context: Arc<ConnectionContext<B>>,
}

impl<B: BusSession> BridgeServer<B> {
    /// Bind the listening socket. Failing to bind is a startup error.
    pub async fn bind(
        bus: B,
        thing: impl Into<String>,
        config: &BridgeConfig,
    ) -> Result<Self, CoreError> {
        let thing = thing.into();
        let filter = update_accepted_filter(&thing)?;

        let listener = TcpListener::bind(config.listen_addr)
            .await
            .map_err(|e| CoreError::Bind {
                addr: config.listen_addr.to_string(),
                reason: e.to_string(),
            })?;

        Ok(Self {
            listener,
            context: Arc::new(ConnectionContext {
                bus,
                thing,
                filter,
                sync_interval: config.sync_interval,
                page_size: config.list_page_size,
            }),
        })
    }

    /// The bound address (useful when binding to port 0).
    pub fn local_addr(&self) -> Result<SocketAddr, CoreError> {
        self.listener.local_addr().map_err(|e| CoreError::Bind {
            addr: "<bound socket>".into(),
            reason: e.to_string(),
        })
    }

    /// Accept clients until `cancel` fires, then wait for every open
    /// connection to release its resources.
    pub async fn serve(self, cancel: CancellationToken) -> Result<(), CoreError> {
        let addr = self.local_addr()?;
        info!(%addr, filter = %self.context.filter, "shadow bridge listening");

        let tracker = TaskTracker::new();
        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        let context = Arc::clone(&self.context);
                        let token = cancel.child_token();
                        tracker.spawn(connection::run(context, stream, peer, token));
                    }
                    Err(e) => {
                        warn!(error = %e, "accept failed");
                        tokio::time::sleep(ACCEPT_BACKOFF).await;
                    }
                }
            }
        }

        tracker.close();
        info!(open = tracker.len(), "shadow bridge stopping");
        tracker.wait().await;
        info!("shadow bridge stopped");
        Ok(())
    }
}
