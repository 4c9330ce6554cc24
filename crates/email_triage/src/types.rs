use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::correlator::extract_address;

/// Sender value used when a record carries no `From:` line
pub const UNKNOWN_SENDER: &str = "unknown";

/// A message as fetched from the mailbox, before normalisation.
///
/// This is also the structured input form of the parser.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawMessage {
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub from: Option<String>,
    #[serde(default)]
    pub received: Option<String>,
    #[serde(default)]
    pub body: String,
}

/// One inbound email.
///
/// There is no stable identity; two messages with the same subject and sender
/// are treated as possibly the same thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub subject: String,
    /// Raw `From` header, e.g. `Ann <ann@co.com>`
    pub from_display: String,
    /// Lowercased address inside the angle brackets of `from_display`
    pub from_address: Option<String>,
    pub received_at: Option<String>,
    pub body: String,
}

impl Message {
    pub fn new(
        subject: impl Into<String>,
        from_display: impl Into<String>,
        received_at: Option<String>,
        body: impl Into<String>,
    ) -> Self {
        let from_display = from_display.into();
        let from_address = extract_address(&from_display);
        Self {
            subject: subject.into(),
            from_display,
            from_address,
            received_at,
            body: body.into(),
        }
    }
}

/// A previously sent message, used only for correlation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentRecord {
    pub subject: String,
    /// Lowercased recipient addresses (To + Cc)
    pub recipients: BTreeSet<String>,
    pub sent_at: String,
}

impl SentRecord {
    pub fn new<I, S>(subject: impl Into<String>, recipients: I, sent_at: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            subject: subject.into(),
            recipients: recipients
                .into_iter()
                .map(|r| r.as_ref().trim().to_lowercase())
                .filter(|r| !r.is_empty())
                .collect(),
            sent_at: sent_at.into(),
        }
    }

    pub fn has_recipient(&self, address: &str) -> bool {
        let address = address.to_lowercase();
        self.recipients.iter().any(|r| r.to_lowercase() == address)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Importance {
    High,
    Medium,
    Low,
}

impl Importance {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }

    /// Sort position: high first
    pub fn rank(&self) -> u8 {
        match self {
            Self::High => 0,
            Self::Medium => 1,
            Self::Low => 2,
        }
    }
}

/// Model judgment attached to a message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    pub importance: Importance,
    pub reason: String,
    pub needs_response: bool,
    pub time_sensitive: bool,
    pub topics: Vec<String>,
}

/// A classified message plus the live "already answered" flag
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionableRecord {
    pub message: Message,
    pub classification: Classification,
    pub already_responded: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_extracts_address() {
        let msg = Message::new("Invoice #4", "Ann <Ann@Co.com>", None, "please pay");
        assert_eq!(msg.from_address.as_deref(), Some("ann@co.com"));
    }

    #[test]
    fn test_message_without_brackets_has_no_address() {
        let msg = Message::new("Hi", "ann@co.com", None, "");
        assert_eq!(msg.from_address, None);
    }

    #[test]
    fn test_sent_record_lowercases_recipients() {
        let sent = SentRecord::new("Re: Hi", ["Ann@Co.com", " ", "bob@x.org"], "");
        assert_eq!(sent.recipients.len(), 2);
        assert!(sent.has_recipient("ANN@co.com"));
        assert!(!sent.has_recipient("carol@x.org"));
    }

    #[test]
    fn test_importance_serializes_lowercase() {
        let json = serde_json::to_string(&Importance::Medium).unwrap();
        assert_eq!(json, "\"medium\"");
        assert!(Importance::High.rank() < Importance::Low.rank());
    }
}
