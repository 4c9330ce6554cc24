use std::fmt::Write as _;

use email_triage::ranking::{group_by_topic, rank};
use email_triage::report::NeedsResponseReport;
use email_triage::{ActionableRecord, Result};

use super::REPORT_JSON_FILE;
use crate::config::AppConfig;

pub fn run(config: &AppConfig) -> Result<()> {
    let report = NeedsResponseReport::load(&config.output_path(REPORT_JSON_FILE));
    print!("{}", render_topics(&rank(report.records())));
    Ok(())
}

fn render_topics(ranked: &[ActionableRecord]) -> String {
    let mut out = String::new();
    if ranked.is_empty() {
        let _ = writeln!(out, "No emails requiring response. Run `scan` first.");
        return out;
    }

    for (topic, records) in group_by_topic(ranked) {
        let _ = writeln!(out, "{} ({})", topic, records.len());
        for record in records {
            let marker = if record.already_responded { " [responded]" } else { "" };
            let _ = writeln!(
                out,
                "  - [{}] {} ({}){}",
                record.classification.importance.as_str(),
                record.message.subject,
                record.message.from_display,
                marker
            );
        }
    }
    out
}
