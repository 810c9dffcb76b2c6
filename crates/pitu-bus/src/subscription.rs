// ── Subscription handle ──
//
// A subscription is an ordered receiver of bus events plus a release hook.
// Dropping the handle runs the hook exactly once, which is how the broker
// learns the subscriber is gone.

use std::fmt;

use tokio::sync::mpsc;

use crate::message::BusEvent;
use crate::topic::TopicFilter;

type ReleaseHook = Box<dyn FnOnce() + Send + Sync>;

/// A live subscription to a topic filter.
///
/// Events arrive in the order the bus delivered them. `recv()` returns
/// `None` once the bus ends the stream. The queue behind it is bounded;
/// the bus decides what happens to a subscriber that falls behind.
pub struct Subscription {
    filter: TopicFilter,
    rx: mpsc::Receiver<BusEvent>,
    on_release: Option<ReleaseHook>,
}

impl Subscription {
    /// Wrap a receiver as a subscription. Bus implementations attach a
    /// release hook with [`on_release`](Self::on_release).
    pub fn new(filter: TopicFilter, rx: mpsc::Receiver<BusEvent>) -> Self {
        Self {
            filter,
            rx,
            on_release: None,
        }
    }

    /// Run `hook` when this subscription is dropped.
    pub fn on_release(mut self, hook: impl FnOnce() + Send + Sync + 'static) -> Self {
        self.on_release = Some(Box::new(hook));
        self
    }

    /// The filter this subscription was opened with.
    pub fn topic_filter(&self) -> &TopicFilter {
        &self.filter
    }

    /// Wait for the next event. `None` means the stream has ended.
    pub async fn recv(&mut self) -> Option<BusEvent> {
        self.rx.recv().await
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(hook) = self.on_release.take() {
            hook();
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("filter", &self.filter)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::message::BusMessage;
    use serde_json::json;

    #[tokio::test]
    async fn delivers_in_order_then_ends() {
        let (tx, rx) = mpsc::channel(4);
        let mut sub = Subscription::new(TopicFilter::new("a/+").unwrap(), rx);
        assert_eq!(sub.topic_filter().to_string(), "a/+");

        tx.try_send(BusEvent::Message(BusMessage::new("a/1", json!(1)))).unwrap();
        tx.try_send(BusEvent::Message(BusMessage::new("a/2", json!(2)))).unwrap();
        drop(tx);

        let Some(BusEvent::Message(first)) = sub.recv().await else {
            panic!("expected message");
        };
        let Some(BusEvent::Message(second)) = sub.recv().await else {
            panic!("expected message");
        };
        assert_eq!(first.topic, "a/1");
        assert_eq!(second.topic, "a/2");
        assert!(sub.recv().await.is_none());
    }

    #[test]
    fn release_hook_runs_once_on_drop() {
        let released = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&released);
        let (_tx, rx) = mpsc::channel(1);

        let sub = Subscription::new(TopicFilter::new("a").unwrap(), rx)
            .on_release(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            });
        assert_eq!(released.load(Ordering::SeqCst), 0);

        drop(sub);
        assert_eq!(released.load(Ordering::SeqCst), 1);
    }
}
