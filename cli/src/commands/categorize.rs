use std::path::Path;
use tracing::info;

use email_triage::categories::{categorize_all, render_summary, CategorizeOutput};
use email_triage::classifier::Categorizer;
use email_triage::mailbox::Mailbox;
use email_triage::Result;

use super::scan::load_messages;
use super::{signature, CATEGORIZED_FILE};
use crate::adapters::llm::LlmClient;
use crate::adapters::mail_server::MailServer;
use crate::config::{inbox_window, AppConfig};

pub async fn run(config: &AppConfig, from_dump: Option<&Path>, hours: i64) -> Result<()> {
    let mailbox = match from_dump {
        None => Some(MailServer::new(config)?),
        Some(_) => None,
    };
    let categorizer = LlmClient::new(&config.llm, signature(config))?;

    let output = categorize(
        config,
        from_dump,
        hours,
        mailbox.as_ref().map(|m| m as &dyn Mailbox),
        &categorizer,
    )
    .await?;

    let saved_to = config.output_path(CATEGORIZED_FILE);
    print!("{}", render_summary(&output, &saved_to.display().to_string()));
    Ok(())
}

/// Fetch (or read) messages, sort them into buckets and save the buckets.
pub(crate) async fn categorize(
    config: &AppConfig,
    from_dump: Option<&Path>,
    hours: i64,
    mailbox: Option<&dyn Mailbox>,
    categorizer: &dyn Categorizer,
) -> Result<CategorizeOutput> {
    let since = inbox_window(hours)?;
    let messages = load_messages(config, from_dump, since, mailbox).await?;
    info!(messages = messages.len(), "Messages to categorize");

    let output = categorize_all(&messages, categorizer).await;
    output.emails.save(&config.output_path(CATEGORIZED_FILE))?;
    Ok(output)
}
