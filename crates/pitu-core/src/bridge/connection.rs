// ── Single client connection lifecycle ──
//
// handshake → subscribe → list + paced sync → read until close → release.
// The subscription is opened before the listing so an update accepted
// while the sync burst is running still reaches the client.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};
use uuid::Uuid;

use pitu_bus::{BusEvent, BusSession, Subscription, TopicFilter, list_all_shadows};

use super::protocol::{ClientFrame, OutboundEvent};
use super::sink::{ClientSink, OUTBOUND_QUEUE_DEPTH};
use crate::error::CoreError;
use crate::sync::PacedSync;

type WsSink = SplitSink<WebSocketStream<TcpStream>, Message>;
type WsSource = SplitStream<WebSocketStream<TcpStream>>;

/// Shared, read-only settings for every connection of one server.
pub(crate) struct ConnectionContext<B> {
    pub bus: B,
    pub thing: String,
    pub filter: TopicFilter,
    pub sync_interval: Duration,
    pub page_size: u32,
}

/// Serve one client until it disconnects or `cancel` fires.
pub(crate) async fn run<B: BusSession>(
    ctx: Arc<ConnectionContext<B>>,
    stream: TcpStream,
    peer: SocketAddr,
    cancel: CancellationToken,
) {
    let id = Uuid::new_v4();
    match serve_client(&ctx, stream, peer, id, &cancel).await {
        Ok(()) | Err(CoreError::ConnectionClosed) => {
            info!(client = %id, %peer, "client disconnected");
        }
        Err(e) => warn!(client = %id, %peer, error = %e, "client connection failed"),
    }
}

async fn serve_client<B: BusSession>(
    ctx: &ConnectionContext<B>,
    stream: TcpStream,
    peer: SocketAddr,
    id: Uuid,
    cancel: &CancellationToken,
) -> Result<(), CoreError> {
    let ws = tokio_tungstenite::accept_async(stream)
        .await
        .map_err(|e| CoreError::Handshake {
            peer: peer.to_string(),
            reason: e.to_string(),
        })?;
    info!(client = %id, %peer, "client connected");

    let (ws_tx, mut ws_rx) = ws.split();
    // A stalled client trips the connection token and is torn down.
    let (sink, outbound) = ClientSink::channel(OUTBOUND_QUEUE_DEPTH, cancel.clone());

    let subscription =
        ctx.bus
            .subscribe(&ctx.filter)
            .await
            .map_err(|e| CoreError::SubscribeFailure {
                filter: ctx.filter.to_string(),
                reason: e.to_string(),
            })?;

    let writer = tokio::spawn(write_outbound(ws_tx, outbound, cancel.clone()));
    let relay = tokio::spawn(relay_updates(subscription, sink.clone(), cancel.clone(), id));

    let mut sync = match list_all_shadows(&ctx.bus, &ctx.thing, ctx.page_size).await {
        Ok(shadows) => Some(PacedSync::start(
            &ctx.bus,
            &ctx.thing,
            shadows,
            ctx.sync_interval,
            &sink,
            cancel.child_token(),
        )),
        Err(e) => {
            let err = CoreError::ListFailure {
                thing: ctx.thing.clone(),
                reason: e.to_string(),
            };
            warn!(client = %id, error = %err, "initial shadow sync skipped");
            None
        }
    };
    drop(sink);

    let outcome = read_client(&ctx.bus, &mut ws_rx, cancel, id).await;

    // Release everything this connection holds.
    cancel.cancel();
    if let Some(sync) = sync.as_mut() {
        sync.cancel();
    }
    if let Err(e) = relay.await {
        warn!(client = %id, error = %e, "relay task panicked");
    }
    if let Err(e) = writer.await {
        warn!(client = %id, error = %e, "writer task panicked");
    }

    outcome
}

// ── Bus → client ─────────────────────────────────────────────────────

/// Forward every accepted shadow update to the client, in bus order.
/// Dropping the subscription on exit releases it upstream.
async fn relay_updates(
    mut subscription: Subscription,
    sink: ClientSink,
    cancel: CancellationToken,
    id: Uuid,
) {
    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            event = subscription.recv() => match event {
                Some(BusEvent::Message(message)) => {
                    trace!(client = %id, topic = %message.topic, "relaying update");
                    if !sink.emit(OutboundEvent::relay(&message)) {
                        break;
                    }
                }
                Some(BusEvent::StreamError(reason)) => {
                    let err = CoreError::StreamError {
                        filter: subscription.topic_filter().to_string(),
                        reason,
                    };
                    warn!(client = %id, error = %err, "upstream subscription degraded");
                }
                None => {
                    info!(client = %id, "upstream subscription ended");
                    break;
                }
            }
        }
    }
    debug!(client = %id, filter = %subscription.topic_filter(), "releasing upstream subscription");
}

async fn write_outbound(
    mut ws_tx: WsSink,
    mut outbound: mpsc::Receiver<OutboundEvent>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            event = outbound.recv() => {
                let Some(event) = event else { break };
                let frame = match event.to_frame() {
                    Ok(frame) => frame,
                    Err(e) => {
                        warn!(event = %event.event, error = %e, "cannot encode event");
                        continue;
                    }
                };
                if ws_tx.send(Message::text(frame)).await.is_err() {
                    break;
                }
            }
        }
    }
    // Late emits after this point hit a closed queue and are dropped.
    drop(outbound);
    let _ = ws_tx.close().await;
}

// ── Client → bus ─────────────────────────────────────────────────────

async fn read_client<B: BusSession>(
    bus: &B,
    ws_rx: &mut WsSource,
    cancel: &CancellationToken,
    id: Uuid,
) -> Result<(), CoreError> {
    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => return Ok(()),
            frame = ws_rx.next() => match frame {
                Some(Ok(Message::Text(text))) => relay_client_event(bus, text.as_str(), id).await,
                Some(Ok(Message::Binary(data))) => match std::str::from_utf8(&data) {
                    Ok(text) => relay_client_event(bus, text, id).await,
                    Err(_) => debug!(client = %id, "ignoring non-UTF-8 binary frame"),
                },
                Some(Ok(Message::Close(_))) | None => return Err(CoreError::ConnectionClosed),
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    debug!(client = %id, error = %e, "client read failed");
                    return Err(CoreError::ConnectionClosed);
                }
            }
        }
    }
}

/// Republish a client event on the bus under its own name.
async fn relay_client_event<B: BusSession>(bus: &B, text: &str, id: Uuid) {
    let frame = match ClientFrame::parse(text) {
        Ok(frame) => frame,
        Err(e) => {
            warn!(client = %id, error = %e, "dropping client frame");
            return;
        }
    };

    let (topic, payload) = frame.into_publish();
    match bus.publish(&topic, payload).await {
        Ok(()) => debug!(client = %id, topic, "client event published"),
        Err(e) => {
            let err = CoreError::PublishFailure {
                target: topic,
                reason: e.to_string(),
            };
            warn!(client = %id, error = %err, "client event not published");
        }
    }
}
