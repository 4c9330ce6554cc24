use chrono::{DateTime, Utc};
use mailparse::{MailHeaderMap, ParsedMail};
use tracing::{debug, info, warn};

use email_triage::{RawMessage, TriageError};

use super::connection::ImapConnection;
use super::{collect_tolerant, imap_date, uid_list};

pub const INBOX: &str = "INBOX";

/// Fetch every inbox message received since `since` (day granularity).
pub async fn fetch_inbox(conn: &mut ImapConnection, since: DateTime<Utc>) -> Result<Vec<RawMessage>, TriageError> {
    conn.select_folder(INBOX).await?;

    let query = format!("SINCE {}", imap_date(since));
    let uids = conn
        .session
        .uid_search(&query)
        .await
        .map_err(|e| TriageError::Backend(format!("SEARCH failed: {}", e)))?;

    if uids.is_empty() {
        debug!(query = %query, "No inbox messages in window");
        return Ok(vec![]);
    }

    info!(messages = uids.len(), query = %query, "Fetching inbox messages");
    let fetches = collect_tolerant(
        conn.session
            .uid_fetch(uid_list(uids), "(UID RFC822)")
            .await
            .map_err(|e| TriageError::Backend(format!("FETCH failed: {}", e)))?,
        "inbox",
    )
    .await;

    let mut messages = Vec::with_capacity(fetches.len());
    for fetch in &fetches {
        let Some(raw) = fetch.body() else {
            warn!(uid = ?fetch.uid, "FETCH response without a message body");
            continue;
        };
        match parse_rfc822(raw) {
            Ok(message) => messages.push(message),
            Err(e) => warn!(uid = ?fetch.uid, error = %e, "Skipping unparseable message"),
        }
    }

    Ok(messages)
}

/// Subject, From, Date and the first plain-text body of a raw message.
pub fn parse_rfc822(raw: &[u8]) -> Result<RawMessage, TriageError> {
    let mail = mailparse::parse_mail(raw).map_err(|e| TriageError::Parse(format!("Invalid message: {}", e)))?;

    let body = if mail.subparts.is_empty() {
        mail.get_body().unwrap_or_default()
    } else {
        first_plain_part(&mail)
            .map(|part| part.get_body().unwrap_or_default())
            .unwrap_or_default()
    };

    Ok(RawMessage {
        subject: mail.headers.get_first_value("Subject").unwrap_or_default(),
        from: mail.headers.get_first_value("From"),
        received: mail.headers.get_first_value("Date"),
        body: body.trim().to_string(),
    })
}

// Depth-first, skipping attachments.
fn first_plain_part<'a>(part: &'a ParsedMail<'a>) -> Option<&'a ParsedMail<'a>> {
    if part.subparts.is_empty() {
        let is_attachment = part.headers.get_first_value("Content-Disposition").is_some();
        return (part.ctype.mimetype == "text/plain" && !is_attachment).then_some(part);
    }
    part.subparts.iter().find_map(first_plain_part)
}
