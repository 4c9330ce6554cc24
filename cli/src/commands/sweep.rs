use email_triage::mailbox::Mailbox;
use email_triage::state::{process_deletions, DeletionQueue, SweepSummary};
use email_triage::Result;
use tracing::info;

use super::TO_DELETE_FILE;
use crate::adapters::mail_server::MailServer;
use crate::config::AppConfig;

pub async fn run(config: &AppConfig) -> Result<()> {
    let mailbox = MailServer::new(config)?;
    let summary = sweep(config, &mailbox).await?;
    println!(
        "Deletion sweep: {} attempted, {} deleted, {} failed.",
        summary.attempted, summary.deleted, summary.failed
    );
    Ok(())
}

pub(crate) async fn sweep(config: &AppConfig, mailbox: &dyn Mailbox) -> Result<SweepSummary> {
    let queue = DeletionQueue::new(config.output_path(TO_DELETE_FILE));
    let summary = process_deletions(&queue, mailbox).await?;
    info!(
        attempted = summary.attempted,
        deleted = summary.deleted,
        failed = summary.failed,
        "Deletion sweep complete"
    );
    Ok(summary)
}
