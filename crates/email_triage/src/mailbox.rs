use async_trait::async_trait;
use chrono::Duration;

use crate::error::Result;
use crate::types::{RawMessage, SentRecord};

/// Mail protocol capabilities used by the core.
///
/// Implementations own connection handling; every call is independent and
/// may fail with a transport error that the caller logs and skips.
#[async_trait]
pub trait Mailbox: Send + Sync {
    /// Inbox messages received within `since` of now
    async fn fetch_inbox(&self, since: Duration) -> Result<Vec<RawMessage>>;

    /// Sent-folder messages within `since` of now
    async fn fetch_sent(&self, since: Duration) -> Result<Vec<SentRecord>>;

    async fn send(&self, subject: &str, body: &str, recipient: &str) -> Result<()>;

    /// Flag and expunge inbox messages whose subject matches. Returns how many
    /// messages were removed; zero matches is still a success.
    async fn delete_matching(&self, subject: &str) -> Result<usize>;
}
