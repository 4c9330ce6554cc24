use chrono::{DateTime, Utc};
use mailparse::{MailAddr, MailHeaderMap};
use tracing::{debug, info, warn};

use email_triage::{SentRecord, TriageError};

use super::connection::ImapConnection;
use super::{collect_tolerant, imap_date, uid_list};

const HEADER_QUERY: &str = "(UID BODY.PEEK[HEADER.FIELDS (Subject To Cc Date)])";

/// Subjects and recipients of sent messages since `since`.
///
/// Expects a read-only connection; only headers are fetched.
pub async fn fetch_sent(
    conn: &mut ImapConnection,
    folder: &str,
    since: DateTime<Utc>,
) -> Result<Vec<SentRecord>, TriageError> {
    conn.select_folder(folder).await?;

    let uids = conn
        .session
        .uid_search(format!("SINCE {}", imap_date(since)))
        .await
        .map_err(|e| TriageError::Backend(format!("SEARCH failed: {}", e)))?;

    if uids.is_empty() {
        debug!(folder = %folder, "No sent messages in window");
        return Ok(vec![]);
    }

    info!(folder = %folder, messages = uids.len(), "Scanning sent folder");
    let fetches = collect_tolerant(
        conn.session
            .uid_fetch(uid_list(uids), HEADER_QUERY)
            .await
            .map_err(|e| TriageError::Backend(format!("FETCH failed: {}", e)))?,
        "sent headers",
    )
    .await;

    let mut records = Vec::with_capacity(fetches.len());
    for fetch in &fetches {
        match fetch.header().map(parse_sent_headers) {
            Some(Ok(record)) => records.push(record),
            Some(Err(e)) => warn!(uid = ?fetch.uid, error = %e, "Skipping sent message with bad headers"),
            None => debug!(uid = ?fetch.uid, "FETCH response without headers"),
        }
    }

    info!(records = records.len(), "Sent scan complete");
    Ok(records)
}

/// Build a `SentRecord` from a raw Subject/To/Cc/Date header block.
pub fn parse_sent_headers(raw: &[u8]) -> Result<SentRecord, TriageError> {
    let (headers, _) =
        mailparse::parse_headers(raw).map_err(|e| TriageError::Parse(format!("Invalid headers: {}", e)))?;

    let mut recipients = Vec::new();
    for header in headers.iter() {
        let key = header.get_key_ref();
        if !key.eq_ignore_ascii_case("to") && !key.eq_ignore_ascii_case("cc") {
            continue;
        }
        match mailparse::addrparse_header(header) {
            Ok(addrs) => {
                for addr in addrs.iter() {
                    match addr {
                        MailAddr::Single(info) => recipients.push(info.addr.clone()),
                        MailAddr::Group(group) => {
                            recipients.extend(group.addrs.iter().map(|member| member.addr.clone()));
                        }
                    }
                }
            }
            Err(e) => debug!(header = %key, error = %e, "Unparseable recipient header"),
        }
    }

    Ok(SentRecord::new(
        headers.get_first_value("Subject").unwrap_or_default(),
        recipients,
        headers.get_first_value("Date").unwrap_or_default(),
    ))
}
