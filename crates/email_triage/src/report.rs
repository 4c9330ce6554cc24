//! Needs-response reports
//!
//! The JSON report is the hand-off between a scan and a later `respond`
//! session. The text report is for reading.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::path::Path;

use crate::error::Result;
use crate::ranking::group_by_topic;
use crate::state::{read_json_or_default, write_json};
use crate::types::{ActionableRecord, Classification, Message};

/// Body characters kept in the JSON report
pub const BODY_LIMIT: usize = 1000;
/// Body characters shown in the text report
pub const PREVIEW_LIMIT: usize = 300;

const RULE: &str = "==================================================";
const SEPARATOR: &str = "--------------------------------------------------";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportEntry {
    pub subject: String,
    pub from: String,
    pub received: String,
    pub body: String,
    pub analysis: Classification,
    pub already_responded: bool,
}

impl ReportEntry {
    fn from_record(record: &ActionableRecord, now: &str) -> Self {
        let message = &record.message;
        Self {
            subject: message.subject.clone(),
            from: message.from_display.clone(),
            received: message.received_at.clone().unwrap_or_else(|| now.to_string()),
            body: truncate(&message.body, BODY_LIMIT, "..."),
            analysis: record.classification.clone(),
            already_responded: record.already_responded,
        }
    }

    pub fn to_record(&self) -> ActionableRecord {
        ActionableRecord {
            message: Message::new(
                self.subject.clone(),
                self.from.clone(),
                Some(self.received.clone()),
                self.body.clone(),
            ),
            classification: self.analysis.clone(),
            already_responded: self.already_responded,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NeedsResponseReport {
    #[serde(default)]
    pub last_updated: String,
    #[serde(default)]
    pub needs_response_emails: Vec<ReportEntry>,
}

impl NeedsResponseReport {
    pub fn from_records(records: &[ActionableRecord]) -> Self {
        let now = Utc::now().to_rfc3339();
        Self {
            needs_response_emails: records.iter().map(|r| ReportEntry::from_record(r, &now)).collect(),
            last_updated: now,
        }
    }

    pub fn records(&self) -> Vec<ActionableRecord> {
        self.needs_response_emails.iter().map(ReportEntry::to_record).collect()
    }

    /// Missing or corrupt report reads as empty.
    pub fn load(path: &Path) -> Self {
        read_json_or_default(path)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        write_json(path, self)
    }
}

/// Cut `text` to `limit` characters, appending `marker` when shortened.
pub fn truncate(text: &str, limit: usize, marker: &str) -> String {
    match text.char_indices().nth(limit) {
        Some((idx, _)) => format!("{}{}", &text[..idx], marker),
        None => text.to_string(),
    }
}

fn write_entry(out: &mut String, record: &ActionableRecord) {
    let message = &record.message;
    let analysis = &record.classification;

    let _ = writeln!(out, "Subject: {}", message.subject);
    let _ = writeln!(out, "From: {}", message.from_display);
    if let Some(received) = &message.received_at {
        let _ = writeln!(out, "Received: {}", received);
    }
    let _ = writeln!(out, "Importance: {}", analysis.importance.as_str().to_uppercase());
    let _ = writeln!(
        out,
        "Time Sensitive: {}",
        if analysis.time_sensitive { "YES" } else { "No" }
    );
    let _ = writeln!(out, "Topics: {}", analysis.topics.join(", "));
    let _ = writeln!(out, "Reason: {}", analysis.reason);
    if record.already_responded {
        let _ = writeln!(out, "STATUS: ✅ ALREADY RESPONDED");
    }
}

/// Text report for already-ranked records.
pub fn render_text(ranked: &[ActionableRecord], generated_at: &str) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", RULE);
    let _ = writeln!(out, "EMAILS REQUIRING RESPONSE");
    let _ = writeln!(out, "Generated on: {}", generated_at);
    let _ = writeln!(out, "{}\n", RULE);

    if ranked.is_empty() {
        let _ = writeln!(out, "No emails requiring immediate response were found.");
        return out;
    }

    for record in ranked {
        write_entry(&mut out, record);
        let _ = writeln!(out, "Preview: {}\n", truncate(&record.message.body, PREVIEW_LIMIT, "..."));
        let _ = writeln!(out, "{}\n", SEPARATOR);
    }

    let _ = writeln!(out, "{}", RULE);
    let _ = writeln!(out, "BY TOPIC");
    let _ = writeln!(out, "{}\n", RULE);
    for (topic, records) in group_by_topic(ranked) {
        let _ = writeln!(out, "{} ({})", topic, records.len());
        for record in records {
            let _ = writeln!(out, "  - {} ({})", record.message.subject, record.message.from_display);
        }
        out.push('\n');
    }

    out
}

/// Short console listing for already-ranked records.
pub fn render_summary(ranked: &[ActionableRecord]) -> String {
    let mut out = String::new();
    if ranked.is_empty() {
        let _ = writeln!(out, "No emails requiring immediate response were found.");
        return out;
    }

    let _ = writeln!(out, "EMAILS REQUIRING RESPONSE:\n{}", RULE);
    for record in ranked {
        out.push('\n');
        write_entry(&mut out, record);
        let _ = writeln!(out, "{}", SEPARATOR);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ranking::rank;
    use crate::testing::classification;
    use crate::types::Importance;

    fn record(subject: &str, body: &str, responded: bool) -> ActionableRecord {
        ActionableRecord {
            message: Message::new(subject, "Ann <ann@co.com>", None, body),
            classification: classification(Importance::High, true, true),
            already_responded: responded,
        }
    }

    #[test]
    fn test_truncate_counts_characters() {
        assert_eq!(truncate("héllo", 3, "..."), "hél...");
        assert_eq!(truncate("hi", 3, "..."), "hi");
        assert_eq!(truncate("abc", 3, "..."), "abc");
    }

    #[test]
    fn test_report_json_layout() {
        let long_body = "x".repeat(BODY_LIMIT + 10);
        let report = NeedsResponseReport::from_records(&[record("Invoice #4", &long_body, false)]);
        let value = serde_json::to_value(&report).unwrap();

        let entry = &value["needs_response_emails"][0];
        assert_eq!(entry["subject"], "Invoice #4");
        assert_eq!(entry["from"], "Ann <ann@co.com>");
        assert_eq!(entry["analysis"]["importance"], "high");
        assert_eq!(entry["already_responded"], false);
        assert_eq!(entry["body"].as_str().unwrap().chars().count(), BODY_LIMIT + 3);
        // received falls back to the run time
        assert_eq!(entry["received"], value["last_updated"]);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("needs_response_emails.json");
        let report = NeedsResponseReport::from_records(&[record("a", "body", true)]);
        report.save(&path).unwrap();

        let loaded = NeedsResponseReport::load(&path);
        assert_eq!(loaded, report);
        let records = loaded.records();
        assert_eq!(records[0].message.from_address.as_deref(), Some("ann@co.com"));
        assert!(records[0].already_responded);
    }

    #[test]
    fn test_load_missing_report_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert!(NeedsResponseReport::load(&dir.path().join("none.json"))
            .needs_response_emails
            .is_empty());
    }

    #[test]
    fn test_render_text() {
        let ranked = rank(vec![record("Old", "b", true), record("New", "b", false)]);
        let text = render_text(&ranked, "2025-01-06T09:00:00+00:00");

        let new_pos = text.find("Subject: New").unwrap();
        let old_pos = text.find("Subject: Old").unwrap();
        assert!(new_pos < old_pos);
        assert_eq!(text.matches("ALREADY RESPONDED").count(), 1);
        assert!(text.contains("Importance: HIGH"));
        assert!(text.contains("Time Sensitive: YES"));
        assert!(text.contains("general (2)"));
    }

    #[test]
    fn test_render_empty() {
        let text = render_text(&[], "now");
        assert!(text.contains("No emails requiring immediate response were found."));
        assert!(render_summary(&[]).contains("No emails"));
    }
}
