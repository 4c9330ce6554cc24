//! Subcommand implementations. Each takes the loaded configuration and
//! returns once the batch is done.

pub mod categorize;
pub mod opportunities;
pub mod respond;
pub mod scan;
pub mod sweep;
pub mod tasks;
pub mod topics;

use std::fs;
use std::path::Path;

use email_triage::TriageError;

use crate::config::AppConfig;

pub const RECENT_EMAILS_FILE: &str = "recent_emails.txt";
pub const REPORT_JSON_FILE: &str = "needs_response_emails.json";
pub const REPORT_TEXT_FILE: &str = "needs_response_report.txt";
pub const HISTORY_FILE: &str = "response_history.json";
pub const TO_DELETE_FILE: &str = "to_delete.json";
pub const CATEGORIZED_FILE: &str = "categorized_emails.json";
pub const OPPORTUNITY_REPORT_FILE: &str = "opportunity_report.txt";

/// Write a text file, creating its directory.
pub(crate) fn write_text(path: &Path, contents: &str) -> Result<(), TriageError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, contents)?;
    Ok(())
}

/// Name used to sign drafted replies.
pub(crate) fn signature(config: &AppConfig) -> String {
    config
        .llm
        .signature
        .clone()
        .or_else(|| config.account.display_name.clone())
        .or_else(|| config.account.user.clone())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_text_creates_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("report.txt");
        write_text(&path, "hello").unwrap();
        assert_eq!(fs::read_to_string(path).unwrap(), "hello");
    }

    #[test]
    fn test_signature_fallbacks() {
        let mut config = AppConfig::default();
        assert_eq!(signature(&config), "");
        config.account.user = Some("kris@example.com".into());
        assert_eq!(signature(&config), "kris@example.com");
        config.account.display_name = Some("Kris".into());
        assert_eq!(signature(&config), "Kris");
        config.llm.signature = Some("K.".into());
        assert_eq!(signature(&config), "K.");
    }
}
