use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{trace, warn};

use super::protocol::OutboundEvent;

/// Events buffered for one client before it counts as stalled.
pub const OUTBOUND_QUEUE_DEPTH: usize = 256;

/// Outbound queue of one client connection.
///
/// Cloned into every task that talks to the client. Once the connection
/// writer is gone, [`emit`](Self::emit) silently drops events. A client
/// that lets the queue fill up is disconnected through `overflow`.
#[derive(Debug, Clone)]
pub struct ClientSink {
    tx: mpsc::Sender<OutboundEvent>,
    overflow: CancellationToken,
}

impl ClientSink {
    /// A sink holding at most `capacity` events plus the receiver the
    /// connection writer drains. `overflow` is cancelled when the queue
    /// is full.
    pub fn channel(
        capacity: usize,
        overflow: CancellationToken,
    ) -> (Self, mpsc::Receiver<OutboundEvent>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx, overflow }, rx)
    }

    /// Queue an event. Returns `false` if the client is gone or stalled.
    pub fn emit(&self, event: OutboundEvent) -> bool {
        match self.tx.try_send(event) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(event)) => {
                warn!(event = %event.event, "client not reading, disconnecting");
                self.overflow.cancel();
                false
            }
            Err(mpsc::error::TrySendError::Closed(event)) => {
                trace!(event = %event.event, "client gone, event dropped");
                false
            }
        }
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}
