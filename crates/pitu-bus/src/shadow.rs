//! Named-shadow topic layout and pagination helpers.
//!
//! Shadow topics follow the `$aws/things/{thing}/shadow/name/{name}/...`
//! layout. Only the `update/accepted` leaf is mirrored to UI clients.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Error;
use crate::session::BusSession;
use crate::topic::TopicFilter;

const SHADOW_PREFIX: &str = "$aws/things";
const UPDATE_ACCEPTED: &str = "update/accepted";

/// One page of a named-shadow listing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShadowPage {
    pub results: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_token: Option<String>,
    /// Unix timestamp (seconds) of the listing.
    #[serde(default)]
    pub timestamp: i64,
}

/// `$aws/things/{thing}/shadow/name/{shadow}/update/accepted`
pub fn update_accepted_topic(thing: &str, shadow: &str) -> String {
    format!("{SHADOW_PREFIX}/{thing}/shadow/name/{shadow}/{UPDATE_ACCEPTED}")
}

/// Filter matching the update-accepted topic of every named shadow of
/// `thing`.
pub fn update_accepted_filter(thing: &str) -> Result<TopicFilter, Error> {
    TopicFilter::new(update_accepted_topic(thing, "+"))
}

/// Collect every named shadow of `thing`, following `next_token` until
/// the bus reports no further pages.
pub async fn list_all_shadows<B: BusSession>(
    bus: &B,
    thing: &str,
    page_size: u32,
) -> Result<Vec<String>, Error> {
    let mut names = Vec::new();
    let mut next_token = None;
    let mut pages = 0_usize;

    loop {
        let page = bus.list_shadows(thing, page_size, next_token).await?;
        pages += 1;
        names.extend(page.results);

        match page.next_token {
            Some(token) if !token.is_empty() => next_token = Some(token),
            _ => break,
        }
    }

    debug!(thing, pages, shadows = names.len(), "listed named shadows");
    Ok(names)
}
