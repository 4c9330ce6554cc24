//! Response history
//!
//! Append-only log of confirmed sends. Entries are never deduplicated,
//! reordered or removed: a crash between a successful send and the append
//! loses the entry, and re-running after that can log the same reply twice.
//! Entries and top-level keys this version does not understand are written
//! back unchanged.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use super::{read_json, valid_entries, write_json, Stored};
use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseHistoryEntry {
    pub subject: String,
    pub from: String,
    pub responded_at: String,
}

impl ResponseHistoryEntry {
    /// Entry stamped with the current time
    pub fn now(subject: impl Into<String>, from: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            from: from.into(),
            responded_at: Utc::now().to_rfc3339(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseHistory {
    #[serde(default)]
    pub responded_emails: Vec<ResponseHistoryEntry>,
}

/// The file as stored, including anything we do not model
#[derive(Debug, Default, Serialize, Deserialize)]
struct StoredHistory {
    #[serde(default)]
    responded_emails: Vec<Stored<ResponseHistoryEntry>>,
    #[serde(flatten)]
    rest: serde_json::Map<String, serde_json::Value>,
}

/// File-backed response history
#[derive(Debug, Clone)]
pub struct ResponseHistoryStore {
    path: PathBuf,
}

impl ResponseHistoryStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Recognised entries; a missing or unreadable file reads as empty.
    pub fn load(&self) -> ResponseHistory {
        match read_json::<StoredHistory>(&self.path) {
            Ok(stored) => ResponseHistory {
                responded_emails: valid_entries(&stored.unwrap_or_default().responded_emails, &self.path),
            },
            Err(e) => {
                warn!(error = %e, "Treating response history as empty");
                ResponseHistory::default()
            }
        }
    }

    /// Read, append one entry, write everything back. A file that is not
    /// valid JSON is left alone and the append fails.
    pub fn append(&self, entry: ResponseHistoryEntry) -> Result<()> {
        let mut stored: StoredHistory = read_json(&self.path)?.unwrap_or_default();
        info!(subject = %entry.subject, "Recording response in history");
        stored.responded_emails.push(Stored::new(entry));
        write_json(&self.path, &stored)
    }
}
