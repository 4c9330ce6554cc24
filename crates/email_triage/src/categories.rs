//! Sponsorship and business-inquiry sorting
//!
//! An independent pass over the inbox that puts every message in one of
//! three buckets. The bucket file is the input of the opportunity report,
//! where the model separates personal offers from mass marketing.

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::classifier::Categorizer;
use crate::error::{Result, TriageError};
use crate::report::truncate;
use crate::state::{read_json, write_json};
use crate::types::Message;

/// Listed on the console only above this confidence
pub const HIGH_CONFIDENCE: f64 = 0.8;
/// Body characters handed to the opportunity ranking
pub const SNIPPET_LIMIT: usize = 500;
pub const REPORT_TITLE: &str = "BUSINESS AND SPONSORSHIP OPPORTUNITY REPORT";

const RULE: &str = "==================================================";
const SEPARATOR: &str = "--------------------------------------------------";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmailCategory {
    Sponsorship,
    BusinessInquiry,
    Other,
}

impl EmailCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sponsorship => "sponsorship",
            Self::BusinessInquiry => "business_inquiry",
            Self::Other => "other",
        }
    }
}

/// Model verdict for one message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmailAnalysis {
    pub category: EmailCategory,
    /// 0.0..=1.0
    pub confidence: f64,
    pub reason: String,
    #[serde(default)]
    pub company_name: Option<String>,
    #[serde(default)]
    pub topic: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategorizedEmail {
    pub subject: String,
    pub from: String,
    pub received: String,
    pub body: String,
    pub analysis: EmailAnalysis,
}

/// Contents of `categorized_emails.json`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CategorizedEmails {
    #[serde(default)]
    pub last_updated: String,
    #[serde(default)]
    pub sponsorship_emails: Vec<CategorizedEmail>,
    #[serde(default)]
    pub business_emails: Vec<CategorizedEmail>,
    #[serde(default)]
    pub other_emails: Vec<CategorizedEmail>,
}

impl CategorizedEmails {
    pub fn push(&mut self, email: CategorizedEmail) {
        let bucket = match email.analysis.category {
            EmailCategory::Sponsorship => &mut self.sponsorship_emails,
            EmailCategory::BusinessInquiry => &mut self.business_emails,
            EmailCategory::Other => &mut self.other_emails,
        };
        bucket.push(email);
    }

    pub fn len(&self) -> usize {
        self.sponsorship_emails.len() + self.business_emails.len() + self.other_emails.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sponsorship and business mail the model is sure about
    pub fn high_confidence(&self) -> impl Iterator<Item = &CategorizedEmail> {
        self.sponsorship_emails
            .iter()
            .chain(&self.business_emails)
            .filter(|e| e.analysis.confidence > HIGH_CONFIDENCE)
    }

    /// Business inquiries then sponsorships, the opportunity report input
    pub fn opportunities(&self) -> Vec<OpportunityCandidate> {
        self.business_emails
            .iter()
            .chain(&self.sponsorship_emails)
            .map(OpportunityCandidate::from)
            .collect()
    }

    /// The file is produced by `categorize`; a missing one is an error.
    pub fn load(path: &Path) -> Result<Self> {
        read_json(path)?.ok_or_else(|| {
            TriageError::Io(format!(
                "{} not found, run `categorize` first",
                path.display()
            ))
        })
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        write_json(path, self)
    }
}

/// What the ranking model sees of one email
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OpportunityCandidate {
    pub category: EmailCategory,
    pub from: String,
    pub subject: String,
    pub company: Option<String>,
    pub topic: Option<String>,
    pub confidence: f64,
    pub snippet: String,
}

impl From<&CategorizedEmail> for OpportunityCandidate {
    fn from(email: &CategorizedEmail) -> Self {
        Self {
            category: email.analysis.category,
            from: email.from.clone(),
            subject: email.subject.clone(),
            company: email.analysis.company_name.clone(),
            topic: email.analysis.topic.clone(),
            confidence: email.analysis.confidence,
            snippet: truncate(&email.body, SNIPPET_LIMIT, "..."),
        }
    }
}

/// Ranks candidates into "High Value" and "Mass Marketing/Generic" and
/// returns the report body as free text.
#[async_trait]
pub trait OpportunityRanker: Send + Sync {
    async fn rank_opportunities(&self, candidates: &[OpportunityCandidate]) -> Result<String>;
}

#[derive(Debug, Clone, Default)]
pub struct CategorizeOutput {
    pub emails: CategorizedEmails,
    pub processed: usize,
    pub failed: usize,
}

/// Categorize `messages` one at a time. Failures are logged and the
/// message is left out of every bucket.
pub async fn categorize_all<C>(messages: &[Message], categorizer: &C) -> CategorizeOutput
where
    C: Categorizer + ?Sized,
{
    let now = Utc::now().to_rfc3339();
    let mut output = CategorizeOutput {
        emails: CategorizedEmails {
            last_updated: now.clone(),
            ..Default::default()
        },
        ..Default::default()
    };

    for message in messages {
        output.processed += 1;

        let analysis = match categorizer.categorize(message).await {
            Ok(a) => a,
            Err(e) => {
                output.failed += 1;
                warn!(subject = %message.subject, error = %e, "Categorization failed, skipping message");
                continue;
            }
        };

        debug!(
            subject = %message.subject,
            category = analysis.category.as_str(),
            confidence = analysis.confidence,
            "Categorized"
        );

        output.emails.push(CategorizedEmail {
            subject: message.subject.clone(),
            from: message.from_display.clone(),
            received: message.received_at.clone().unwrap_or_else(|| now.clone()),
            body: message.body.clone(),
            analysis,
        });
    }

    info!(
        processed = output.processed,
        sponsorship = output.emails.sponsorship_emails.len(),
        business = output.emails.business_emails.len(),
        other = output.emails.other_emails.len(),
        failed = output.failed,
        "Categorization run complete"
    );
    output
}

/// Bucket counts followed by the high-confidence listing.
pub fn render_summary(output: &CategorizeOutput, saved_to: &str) -> String {
    let emails = &output.emails;
    let mut out = String::new();
    let _ = writeln!(out, "Processed {} emails", output.processed);
    let _ = writeln!(out, "Sponsorship requests: {}", emails.sponsorship_emails.len());
    let _ = writeln!(out, "Business inquiries: {}", emails.business_emails.len());
    let _ = writeln!(out, "Other emails: {}", emails.other_emails.len());
    let _ = writeln!(out, "\nDetailed results saved to: {}", saved_to);

    let _ = writeln!(
        out,
        "\nHigh Confidence Business/Sponsorship Emails (>{}):",
        HIGH_CONFIDENCE
    );
    for email in emails.high_confidence() {
        let analysis = &email.analysis;
        let _ = writeln!(out, "\nCategory: {}", analysis.category.as_str());
        let _ = writeln!(out, "From: {}", email.from);
        let _ = writeln!(out, "Subject: {}", email.subject);
        if let Some(company) = &analysis.company_name {
            let _ = writeln!(out, "Company: {}", company);
        }
        if let Some(topic) = &analysis.topic {
            let _ = writeln!(out, "Topic: {}", topic);
        }
        let _ = writeln!(out, "Reason: {}", analysis.reason);
        let _ = writeln!(out, "{}", SEPARATOR);
    }
    out
}

/// Ask `ranker` for the opportunity report. `None` when there are no
/// business or sponsorship emails to rank.
pub async fn opportunity_report<R>(emails: &CategorizedEmails, ranker: &R) -> Result<Option<String>>
where
    R: OpportunityRanker + ?Sized,
{
    let candidates = emails.opportunities();
    if candidates.is_empty() {
        return Ok(None);
    }

    info!(candidates = candidates.len(), "Ranking business and sponsorship emails");
    let body = ranker.rank_opportunities(&candidates).await?;
    Ok(Some(format!("{}\n{}\n\n{}\n", REPORT_TITLE, RULE, body.trim_end())))
}
