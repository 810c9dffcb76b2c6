// ── Bus session contract ──
//
// Every component receives a session handle explicitly instead of reaching
// for a global client. Implementations are cheap clones of one shared
// session; the session serializes call dispatch itself, so callers never
// lock around it.

use std::future::Future;

use bytes::Bytes;

use crate::error::Error;
use crate::message::Payload;
use crate::shadow::ShadowPage;
use crate::subscription::Subscription;
use crate::topic::TopicFilter;

/// Operations the gateway needs from the local bus.
pub trait BusSession: Clone + Send + Sync + 'static {
    /// Open a subscription. The returned handle releases the upstream
    /// subscription when dropped.
    fn subscribe(
        &self,
        filter: &TopicFilter,
    ) -> impl Future<Output = Result<Subscription, Error>> + Send;

    /// Publish a payload on a concrete topic.
    fn publish(
        &self,
        topic: &str,
        payload: Payload,
    ) -> impl Future<Output = Result<(), Error>> + Send;

    /// Fetch the current document of a named shadow.
    fn get_shadow(
        &self,
        thing: &str,
        shadow: &str,
    ) -> impl Future<Output = Result<Bytes, Error>> + Send;

    /// Apply an update document (`{"state": {...}}`) to a named shadow,
    /// returning the accepted document.
    fn update_shadow(
        &self,
        thing: &str,
        shadow: &str,
        document: Bytes,
    ) -> impl Future<Output = Result<Bytes, Error>> + Send;

    /// List one page of named shadows for a thing.
    fn list_shadows(
        &self,
        thing: &str,
        page_size: u32,
        next_token: Option<String>,
    ) -> impl Future<Output = Result<ShadowPage, Error>> + Send;
}
