use chrono::{Duration, Utc};
use std::fs;
use std::path::Path;
use tracing::{info, warn};

use email_triage::classifier::Classifier;
use email_triage::mailbox::Mailbox;
use email_triage::parser::{parse_dump, parse_records, render_dump};
use email_triage::pipeline::classify_all;
use email_triage::ranking::rank;
use email_triage::report::{render_summary, render_text, NeedsResponseReport};
use email_triage::state::DeletionQueue;
use email_triage::{ActionableRecord, Message, Result, TriageError};

use super::{signature, write_text, RECENT_EMAILS_FILE, REPORT_JSON_FILE, REPORT_TEXT_FILE, TO_DELETE_FILE};
use crate::adapters::llm::LlmClient;
use crate::adapters::mail_server::MailServer;
use crate::config::{inbox_window, sent_window, AppConfig};

#[derive(Debug, Clone, Default)]
pub struct ScanOptions<'a> {
    /// Classify a saved dump instead of fetching the inbox
    pub from_dump: Option<&'a Path>,
    pub hours: i64,
    pub days: i64,
}

pub async fn run(config: &AppConfig, options: &ScanOptions<'_>) -> Result<()> {
    let mailbox = match options.from_dump {
        None => Some(MailServer::new(config)?),
        Some(_) => match MailServer::new(config) {
            Ok(server) => Some(server),
            Err(e) => {
                warn!(error = %e, "No mailbox access, sent-mail correlation disabled");
                None
            }
        },
    };
    let classifier = LlmClient::new(&config.llm, signature(config))?;

    let ranked = scan(
        config,
        options,
        mailbox.as_ref().map(|m| m as &dyn Mailbox),
        &classifier,
    )
    .await?;

    print!("{}", render_summary(&ranked));
    Ok(())
}

/// Fetch (or read), classify, correlate, rank and write both reports.
pub(crate) async fn scan(
    config: &AppConfig,
    options: &ScanOptions<'_>,
    mailbox: Option<&dyn Mailbox>,
    classifier: &dyn Classifier,
) -> Result<Vec<ActionableRecord>> {
    let inbox_since = inbox_window(options.hours)?;
    let sent_since = sent_window(options.days)?;

    let messages = load_messages(config, options.from_dump, inbox_since, mailbox).await?;
    info!(messages = messages.len(), "Messages to classify");

    let sent = match mailbox {
        Some(mailbox) => match mailbox.fetch_sent(sent_since).await {
            Ok(sent) => sent,
            Err(e) => {
                warn!(error = %e, "Could not fetch sent mail, treating every message as unanswered");
                Vec::new()
            }
        },
        None => Vec::new(),
    };
    info!(sent = sent.len(), days = options.days, "Sent records for correlation");

    let queue = DeletionQueue::new(config.output_path(TO_DELETE_FILE));
    let output = classify_all(&messages, &sent, classifier, Some(&queue)).await;
    let ranked = rank(output.actionable);

    NeedsResponseReport::from_records(&ranked).save(&config.output_path(REPORT_JSON_FILE))?;
    let text_path = config.output_path(REPORT_TEXT_FILE);
    write_text(&text_path, &render_text(&ranked, &Utc::now().to_rfc3339()))?;

    let summary = &output.summary;
    info!(
        processed = summary.processed,
        needs_response = summary.needs_response,
        already_responded = summary.already_responded,
        new = summary.new_requiring_response(),
        failed = summary.failed,
        queued_for_deletion = summary.queued_for_deletion,
        report = %text_path.display(),
        "Scan complete"
    );

    Ok(ranked)
}

pub(super) async fn load_messages(
    config: &AppConfig,
    from_dump: Option<&Path>,
    since: Duration,
    mailbox: Option<&dyn Mailbox>,
) -> Result<Vec<Message>> {
    if let Some(path) = from_dump {
        info!(path = %path.display(), "Reading mailbox dump");
        let text = fs::read_to_string(path)
            .map_err(|e| TriageError::Io(format!("Failed to read {}: {}", path.display(), e)))?;
        return Ok(parse_dump(&text));
    }

    let mailbox = mailbox.ok_or_else(|| TriageError::Config("no mailbox configured".into()))?;
    let raw = mailbox.fetch_inbox(since).await?;

    let dump_path = config.output_path(RECENT_EMAILS_FILE);
    if let Err(e) = write_text(&dump_path, &render_dump(&raw)) {
        warn!(path = %dump_path.display(), error = %e, "Could not write mailbox dump");
    }

    Ok(parse_records(&raw))
}
