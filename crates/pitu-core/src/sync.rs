// ── Paced shadow sync ──
//
// Seeds a freshly connected client with the current document of every
// named shadow. The i-th fetch fires no earlier than `i * interval` after
// the sync starts, so a connect never issues all fetches at once against
// the shared bus session.

use std::time::Duration;

use tokio::task::JoinSet;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use pitu_bus::BusSession;

use crate::bridge::{ClientSink, OutboundEvent};

/// The scheduled sync tasks of one client connection.
///
/// Only the fetch start times are paced. Each fetch runs in its own task
/// and emits as soon as it completes, so emits are `interval` apart only
/// while fetches take about the same time; a slow fetch of shadow `i` may
/// be emitted after shadow `i + 1`.
///
/// [`cancel`](Self::cancel) stops every task that has not fired yet.
/// Fetches already in flight run to completion but their results are
/// discarded. Dropping the handle cancels as well.
pub struct PacedSync {
    cancel: CancellationToken,
    tasks: JoinSet<()>,
}

impl PacedSync {
    /// Schedule one fetch-and-emit task per shadow name, in list order.
    pub fn start<B: BusSession>(
        bus: &B,
        thing: &str,
        shadows: Vec<String>,
        interval: Duration,
        sink: &ClientSink,
        cancel: CancellationToken,
    ) -> Self {
        let start = Instant::now();
        let scheduled = shadows.len();
        let mut tasks = JoinSet::new();

        for (index, shadow) in shadows.into_iter().enumerate() {
            let offset = interval.saturating_mul(u32::try_from(index).unwrap_or(u32::MAX));
            let bus = bus.clone();
            let thing = thing.to_owned();
            let sink = sink.clone();
            let cancel = cancel.clone();

            tasks.spawn(async move {
                tokio::select! {
                    biased;
                    () = cancel.cancelled() => {
                        trace!(shadow, "sync cancelled before firing");
                        return;
                    }
                    () = tokio::time::sleep_until(start + offset) => {}
                }
                sync_one(&bus, &thing, &shadow, &sink, &cancel).await;
            });
        }

        debug!(thing, scheduled, interval_ms = interval.as_millis(), "shadow sync scheduled");
        Self { cancel, tasks }
    }

    /// Cancel every pending task at once.
    pub fn cancel(&mut self) {
        self.cancel.cancel();
        // In-flight fetches finish on their own and discard their result.
        self.tasks.detach_all();
    }

    /// Wait for every scheduled task to finish.
    pub async fn wait(mut self) {
        while self.tasks.join_next().await.is_some() {}
    }
}

impl Drop for PacedSync {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn sync_one<B: BusSession>(
    bus: &B,
    thing: &str,
    shadow: &str,
    sink: &ClientSink,
    cancel: &CancellationToken,
) {
    match bus.get_shadow(thing, shadow).await {
        Ok(document) => {
            if cancel.is_cancelled() {
                trace!(shadow, "client gone, late shadow fetch discarded");
                return;
            }
            sink.emit(OutboundEvent::shadow_sync(shadow, &document));
        }
        Err(e) if e.is_not_found() => debug!(shadow, "shadow removed before sync, skipped"),
        Err(e) => warn!(shadow, error = %e, "shadow sync fetch failed"),
    }
}
