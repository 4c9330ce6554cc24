use tracing::{info, warn};

use email_triage::classifier::Drafter;
use email_triage::correlator::already_responded;
use email_triage::mailbox::Mailbox;
use email_triage::ranking::rank;
use email_triage::report::NeedsResponseReport;
use email_triage::responder::{DecisionSource, LoopSummary, ResponseLoop};
use email_triage::state::ResponseHistoryStore;
use email_triage::Result;

use super::{signature, HISTORY_FILE, REPORT_JSON_FILE};
use crate::adapters::llm::LlmClient;
use crate::adapters::mail_server::MailServer;
use crate::config::{sent_window, AppConfig};
use crate::prompt::TerminalPrompt;

pub async fn run(config: &AppConfig, days: i64) -> Result<()> {
    let mailbox = MailServer::new(config)?;
    let drafter = LlmClient::new(&config.llm, signature(config))?;
    let mut prompt = TerminalPrompt::stdio();

    let summary = respond(config, days, &mailbox, &drafter, &mut prompt).await?;
    println!(
        "\nDone: {} sent, {} skipped, {} failed.",
        summary.sent, summary.skipped, summary.failed
    );
    Ok(())
}

/// Review every record of the stored report, answered ones last.
pub(crate) async fn respond(
    config: &AppConfig,
    days: i64,
    mailbox: &dyn Mailbox,
    drafter: &dyn Drafter,
    decisions: &mut dyn DecisionSource,
) -> Result<LoopSummary> {
    let sent_since = sent_window(days)?;
    let report_path = config.output_path(REPORT_JSON_FILE);
    let mut records = NeedsResponseReport::load(&report_path).records();
    if records.is_empty() {
        info!(report = %report_path.display(), "No emails requiring response found in the report");
        return Ok(LoopSummary::default());
    }

    // The report may be stale; replies sent since the scan count too.
    match mailbox.fetch_sent(sent_since).await {
        Ok(sent) => {
            for record in records.iter_mut() {
                record.already_responded = already_responded(&record.message, &sent);
            }
        }
        Err(e) => warn!(error = %e, "Could not fetch sent mail, using the stored responded flags"),
    }

    let records = rank(records);
    let history = ResponseHistoryStore::new(config.output_path(HISTORY_FILE));
    Ok(ResponseLoop::new(drafter, mailbox, &history).run(&records, decisions).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{classification, FakeDrafter, FakeMailbox};
    use email_triage::responder::{Decision, Draft};
    use email_triage::{ActionableRecord, Importance, Message, SentRecord};
    use std::path::Path;

    struct AcceptAll {
        reviewed: Vec<String>,
        confirm: bool,
    }

    impl DecisionSource for AcceptAll {
        fn decide(&mut self, record: &ActionableRecord, _recipient: Option<&str>, _draft: &Draft) -> Decision {
            self.reviewed.push(record.message.subject.clone());
            Decision::Accept
        }

        fn confirm_already_responded(&mut self, _record: &ActionableRecord) -> bool {
            self.confirm
        }
    }

    fn config(dir: &Path) -> AppConfig {
        let mut config = AppConfig::default();
        config.triage.output_dir = dir.to_path_buf();
        config
    }

    fn record(subject: &str, from: &str, responded: bool) -> ActionableRecord {
        ActionableRecord {
            message: Message::new(subject, from, None, "body"),
            classification: classification(Importance::High, true, true, &["general"]),
            already_responded: responded,
        }
    }

    fn write_report(config: &AppConfig, records: &[ActionableRecord]) {
        NeedsResponseReport::from_records(records)
            .save(&config.output_path(REPORT_JSON_FILE))
            .unwrap();
    }

    #[tokio::test]
    async fn test_fresh_sent_mail_overrides_stored_flag() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());
        write_report(
            &config,
            &[record("Invoice #4", "Ann <ann@co.com>", false), record("Contract", "Bob <bob@co.com>", false)],
        );
        let mailbox = FakeMailbox::default().with_sent(vec![SentRecord::new("Re: Invoice #4", ["ann@co.com"], "")]);
        let mut decisions = AcceptAll {
            reviewed: Vec::new(),
            confirm: false,
        };

        let summary = respond(&config, 7, &mailbox, &FakeDrafter, &mut decisions).await.unwrap();

        assert_eq!(decisions.reviewed, vec!["Contract"]);
        assert_eq!(summary.sent, 1);
        assert_eq!(summary.skipped, 1);

        let outbox = mailbox.outbox.lock().unwrap();
        assert_eq!(outbox.len(), 1);
        assert_eq!(outbox[0].0, "Re: Contract");
        assert_eq!(outbox[0].2, "bob@co.com");

        let history = ResponseHistoryStore::new(config.output_path(HISTORY_FILE)).load();
        assert_eq!(history.responded_emails.len(), 1);
        assert_eq!(history.responded_emails[0].subject, "Contract");
    }

    #[tokio::test]
    async fn test_stored_flag_used_when_sent_fetch_fails() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());
        write_report(&config, &[record("Invoice #4", "Ann <ann@co.com>", true)]);
        let mailbox = FakeMailbox::default().failing_sent();
        let mut decisions = AcceptAll {
            reviewed: Vec::new(),
            confirm: true,
        };

        let summary = respond(&config, 7, &mailbox, &FakeDrafter, &mut decisions).await.unwrap();

        // confirmed despite the stored flag
        assert_eq!(decisions.reviewed, vec!["Invoice #4"]);
        assert_eq!(summary.sent, 1);
    }

    #[tokio::test]
    async fn test_missing_report_is_a_no_op() {
        let dir = tempfile::tempdir().unwrap();
        let mailbox = FakeMailbox::default();
        let mut decisions = AcceptAll {
            reviewed: Vec::new(),
            confirm: true,
        };

        let summary = respond(&config(dir.path()), 7, &mailbox, &FakeDrafter, &mut decisions).await.unwrap();
        assert_eq!(summary, LoopSummary::default());
    }

    #[tokio::test]
    async fn test_out_of_range_lookback_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mailbox = FakeMailbox::default();
        let mut decisions = AcceptAll {
            reviewed: Vec::new(),
            confirm: true,
        };

        for days in [0, -3, i64::MAX] {
            let result = respond(&config(dir.path()), days, &mailbox, &FakeDrafter, &mut decisions).await;
            assert!(matches!(result, Err(email_triage::TriageError::Config(_))));
        }
    }
}
