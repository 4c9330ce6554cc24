//! Response correlation
//!
//! Decides whether an inbound message was already answered by looking for a
//! sent message to the same address with a matching subject. Matching is
//! heuristic: subjects match when equal after normalisation or when one
//! contains the other, so very short subjects ("Hi") over-match.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::types::{Message, SentRecord};

static ADDRESS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<(.+?)>").expect("valid address regex"));

static REPLY_PREFIX_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(?:re|fwd):\s*").expect("valid prefix regex"));

/// Address inside the first pair of angle brackets, lowercased.
pub fn extract_address(from: &str) -> Option<String> {
    ADDRESS_RE
        .captures(from)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_lowercase())
        .filter(|a| !a.is_empty())
}

/// Lowercase and strip exactly one leading `re:` / `fwd:` prefix.
pub fn normalize_subject(subject: &str) -> String {
    let lower = subject.to_lowercase();
    REPLY_PREFIX_RE.replace(&lower, "").into_owned()
}

fn subjects_match(inbound: &str, sent: &str) -> bool {
    inbound == sent || sent.contains(inbound) || inbound.contains(sent)
}

/// First sent record that looks like a reply to `message`.
pub fn find_response<'a>(message: &Message, sent_records: &'a [SentRecord]) -> Option<&'a SentRecord> {
    let address = message.from_address.as_deref()?;
    let subject = normalize_subject(&message.subject);

    sent_records
        .iter()
        .filter(|sent| sent.has_recipient(address))
        .find(|sent| subjects_match(&subject, &normalize_subject(&sent.subject)))
}

/// Whether `message` has already been responded to.
///
/// Returns `false` when the sender address cannot be extracted.
pub fn already_responded(message: &Message, sent_records: &[SentRecord]) -> bool {
    match find_response(message, sent_records) {
        Some(sent) => {
            debug!(subject = %message.subject, sent_subject = %sent.subject, "Found earlier reply");
            true
        }
        None => false,
    }
}
