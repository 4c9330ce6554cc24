//! Mailbox dump parsing
//!
//! Two input shapes produce the same `Message` sequence:
//!
//! - structured `RawMessage` records (what the IMAP adapter returns)
//! - the flat text dump written between runs:
//!
//! ```text
//! Subject: <subject>
//! From: <sender>
//! Received: <date>
//! Body: <first body line>
//! <more body lines>
//! --------------------------------------------------
//! ```
//!
//! Fields are recognised by line prefix only. Blank body lines are dropped
//! in both shapes, so a message does not keep its paragraph breaks.

use crate::types::{Message, RawMessage, UNKNOWN_SENDER};

/// Record separator line: 50 dashes
pub const SEPARATOR: &str = "--------------------------------------------------";

const SUBJECT: &str = "Subject:";
const FROM: &str = "From:";
const RECEIVED: &str = "Received:";
const BODY: &str = "Body:";

/// Value after a marker, with the single conventional space removed.
fn marker_value<'a>(line: &'a str, marker: &str) -> Option<&'a str> {
    line.strip_prefix(marker)
        .map(|rest| rest.strip_prefix(' ').unwrap_or(rest))
}

/// Join body lines, dropping blank ones.
fn normalize_body<'a>(lines: impl IntoIterator<Item = &'a str>) -> String {
    lines
        .into_iter()
        .map(|l| l.trim_end())
        .filter(|l| !l.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

#[derive(Default)]
struct PendingMessage {
    subject: String,
    from: Option<String>,
    received: Option<String>,
    body_lines: Vec<String>,
}

impl PendingMessage {
    fn finish(self) -> Message {
        let from = self.from.unwrap_or_else(|| UNKNOWN_SENDER.to_string());
        let body = normalize_body(self.body_lines.iter().map(String::as_str));
        Message::new(self.subject, from, self.received, body)
    }
}

/// Parse the text dump. Malformed or empty input yields no messages.
pub fn parse_dump(text: &str) -> Vec<Message> {
    let mut messages = Vec::new();
    let mut current: Option<PendingMessage> = None;
    let mut in_body = false;

    for line in text.lines() {
        let line = line.trim_end();

        if let Some(subject) = marker_value(line, SUBJECT) {
            if let Some(done) = current.take() {
                messages.push(done.finish());
            }
            current = Some(PendingMessage {
                subject: subject.to_string(),
                ..Default::default()
            });
            in_body = false;
            continue;
        }

        if line.starts_with(SEPARATOR) {
            in_body = false;
            continue;
        }

        // Anything before the first Subject: line has no record to attach to
        let Some(pending) = current.as_mut() else {
            continue;
        };

        if let Some(from) = marker_value(line, FROM) {
            pending.from = Some(from.to_string());
        } else if let Some(received) = marker_value(line, RECEIVED) {
            pending.received = Some(received.to_string());
        } else if let Some(first) = marker_value(line, BODY) {
            pending.body_lines = vec![first.to_string()];
            in_body = true;
        } else if in_body {
            pending.body_lines.push(line.to_string());
        }
    }

    if let Some(done) = current.take() {
        messages.push(done.finish());
    }

    messages
}

/// Normalise structured records the same way the dump parser does.
pub fn parse_records(records: &[RawMessage]) -> Vec<Message> {
    records
        .iter()
        .map(|r| {
            let from = r
                .from
                .as_deref()
                .map(str::trim)
                .filter(|f| !f.is_empty())
                .unwrap_or(UNKNOWN_SENDER);
            Message::new(
                r.subject.clone(),
                from,
                r.received.clone(),
                normalize_body(r.body.lines()),
            )
        })
        .collect()
}

/// Render records in the dump format read by `parse_dump`.
pub fn render_dump(records: &[RawMessage]) -> String {
    let mut out = String::new();
    for r in records {
        out.push_str(&format!("{} {}\n", SUBJECT, single_line(&r.subject)));
        out.push_str(&format!(
            "{} {}\n",
            FROM,
            single_line(r.from.as_deref().unwrap_or(UNKNOWN_SENDER))
        ));
        if let Some(received) = &r.received {
            out.push_str(&format!("{} {}\n", RECEIVED, single_line(received)));
        }
        out.push_str(&format!("{} {}\n", BODY, r.body.trim()));
        out.push_str(SEPARATOR);
        out.push('\n');
    }
    out
}

// Header values are written on one line; a folded subject would otherwise
// leak into the next field.
fn single_line(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}
