use tracing::info;

use email_triage::categories::{opportunity_report, CategorizedEmails, OpportunityRanker};
use email_triage::Result;

use super::{signature, write_text, CATEGORIZED_FILE, OPPORTUNITY_REPORT_FILE};
use crate::adapters::llm::LlmClient;
use crate::config::AppConfig;

pub async fn run(config: &AppConfig) -> Result<()> {
    let ranker = LlmClient::new(&config.llm, signature(config))?;

    match opportunities(config, &ranker).await? {
        Some(report) => {
            println!("\n{}", report);
            println!("Report saved to {}", config.output_path(OPPORTUNITY_REPORT_FILE).display());
        }
        None => println!("No business or sponsorship emails found to analyze."),
    }
    Ok(())
}

/// Rank the last categorization's business and sponsorship emails and save
/// the report. `None` when there was nothing to rank.
pub(crate) async fn opportunities(config: &AppConfig, ranker: &dyn OpportunityRanker) -> Result<Option<String>> {
    let emails = CategorizedEmails::load(&config.output_path(CATEGORIZED_FILE))?;
    let report = opportunity_report(&emails, ranker).await?;

    if let Some(report) = &report {
        let path = config.output_path(OPPORTUNITY_REPORT_FILE);
        write_text(&path, report)?;
        info!(report = %path.display(), "Opportunity report written");
    }
    Ok(report)
}
