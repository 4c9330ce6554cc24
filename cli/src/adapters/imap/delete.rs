use futures::TryStreamExt;
use tracing::{debug, info};

use email_triage::TriageError;

use super::connection::ImapConnection;
use super::inbox::INBOX;
use super::{quote, uid_list};

/// Flag every inbox message whose Subject header contains `subject` as
/// deleted, then expunge. Returns the number of messages flagged.
///
/// Needs a read-write connection.
pub async fn delete_by_subject(conn: &mut ImapConnection, subject: &str) -> Result<usize, TriageError> {
    // An empty HEADER search matches every message that has the header.
    if subject.trim().is_empty() {
        return Err(TriageError::InvalidInput("refusing to delete by an empty subject".into()));
    }
    if conn.read_only {
        return Err(TriageError::InvalidInput("deletion needs a read-write connection".into()));
    }

    conn.select_folder(INBOX).await?;

    let uids = conn
        .session
        .uid_search(format!("HEADER Subject {}", quote(subject)))
        .await
        .map_err(|e| TriageError::Backend(format!("SEARCH failed: {}", e)))?;

    if uids.is_empty() {
        debug!(subject = %subject, "No inbox messages match");
        return Ok(0);
    }

    let count = uids.len();
    let _: Vec<_> = conn
        .session
        .uid_store(uid_list(uids), "+FLAGS (\\Deleted)")
        .await
        .map_err(|e| TriageError::Backend(format!("STORE failed: {}", e)))?
        .try_collect()
        .await
        .map_err(|e| TriageError::Backend(format!("STORE failed: {}", e)))?;

    let _: Vec<_> = conn
        .session
        .expunge()
        .await
        .map_err(|e| TriageError::Backend(format!("EXPUNGE failed: {}", e)))?
        .try_collect()
        .await
        .map_err(|e| TriageError::Backend(format!("EXPUNGE failed: {}", e)))?;

    info!(subject = %subject, count = count, "Deleted inbox messages");
    Ok(count)
}
