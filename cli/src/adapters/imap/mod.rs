//! IMAP access: inbox fetch, sent-folder scan, deletion by subject.

pub mod connection;
pub mod delete;
pub mod inbox;
pub mod sent;

use async_imap::types::Fetch;
use chrono::{DateTime, Utc};
use futures::StreamExt;
use tracing::warn;

pub use connection::{connect, ImapConnection};

/// IMAP SEARCH date, e.g. "08-Feb-2025". SINCE has day granularity.
pub fn imap_date(at: DateTime<Utc>) -> String {
    at.format("%d-%b-%Y").to_string()
}

/// Quote a string argument for SEARCH.
pub fn quote(value: &str) -> String {
    let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
    format!("\"{}\"", escaped)
}

/// Sorted, comma-joined UID set.
pub fn uid_list(uids: impl IntoIterator<Item = u32>) -> String {
    let mut uids: Vec<u32> = uids.into_iter().collect();
    uids.sort_unstable();
    uids.iter().map(|u| u.to_string()).collect::<Vec<_>>().join(",")
}

/// Collects a FETCH stream, logging and skipping responses that fail to parse.
pub async fn collect_tolerant<E: std::fmt::Display>(
    stream: impl futures::Stream<Item = Result<Fetch, E>>,
    context: &str,
) -> Vec<Fetch> {
    futures::pin_mut!(stream);
    let mut items = Vec::new();
    while let Some(result) = stream.next().await {
        match result {
            Ok(fetch) => items.push(fetch),
            Err(e) => warn!("Skipping unparseable IMAP response ({}): {}", context, e),
        }
    }
    items
}
