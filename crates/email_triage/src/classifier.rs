//! Classifier, categorizer and drafter seams
//!
//! The language model is an unreliable external call. Its classification
//! output is untyped JSON, so it goes through `parse_classification`, which
//! either yields a fully populated `Classification` or a typed error. Missing
//! fields are never defaulted. Category output gets the same treatment in
//! `parse_category`.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::error::Category;

use crate::categories::{EmailAnalysis, EmailCategory};
use crate::error::{ClassificationError, Result};
use crate::types::{Classification, Importance, Message};

pub const MIN_TOPICS: usize = 1;
pub const MAX_TOPICS: usize = 3;

/// Produces a classification for one message
#[async_trait]
pub trait Classifier: Send + Sync {
    async fn classify(&self, message: &Message) -> std::result::Result<Classification, ClassificationError>;
}

/// Sorts one message into sponsorship / business inquiry / other
#[async_trait]
pub trait Categorizer: Send + Sync {
    async fn categorize(&self, message: &Message) -> std::result::Result<EmailAnalysis, ClassificationError>;
}

/// Writes reply drafts. `instructions` carries the user's edit request when
/// a previous draft is being rewritten.
#[async_trait]
pub trait Drafter: Send + Sync {
    async fn draft_reply(&self, message: &Message, instructions: Option<&str>) -> Result<String>;
}

// Every field is required; serde reports a missing one as a data error.
#[derive(Deserialize)]
struct ModelClassification {
    importance: Importance,
    reason: String,
    needs_response: bool,
    time_sensitive: bool,
    topics: Vec<String>,
}

#[derive(Deserialize)]
struct ModelCategory {
    category: EmailCategory,
    confidence: f64,
    reason: String,
    #[serde(default)]
    company_name: Option<String>,
    #[serde(default)]
    topic: Option<String>,
}

/// Drop a surrounding markdown code fence if the model added one, along
/// with any info string (`json`, `JSON`, `javascript`, ...) on its first line.
fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = match rest.split_once('\n') {
        Some((info, body)) if !info.contains(|c: char| c == '{' || c == '[') => body,
        _ => rest,
    };
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

fn decode<T: serde::de::DeserializeOwned>(raw: &str) -> std::result::Result<T, ClassificationError> {
    let payload = strip_code_fence(raw);
    if payload.is_empty() {
        return Err(ClassificationError::Empty);
    }
    serde_json::from_str(payload).map_err(|e| match e.classify() {
        Category::Data => ClassificationError::Schema(e.to_string()),
        _ => ClassificationError::MalformedJson(e.to_string()),
    })
}

/// Blank optional strings mean "not given".
fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// Validate raw model output against the classification schema.
pub fn parse_classification(raw: &str) -> std::result::Result<Classification, ClassificationError> {
    let parsed: ModelClassification = decode(raw)?;

    let topics: Vec<String> = parsed.topics.into_iter().map(|t| t.trim().to_string()).collect();
    if topics.iter().any(|t| t.is_empty()) {
        return Err(ClassificationError::Schema("topics must not be blank".into()));
    }
    if !(MIN_TOPICS..=MAX_TOPICS).contains(&topics.len()) {
        return Err(ClassificationError::Schema(format!(
            "expected {}-{} topics, got {}",
            MIN_TOPICS,
            MAX_TOPICS,
            topics.len()
        )));
    }

    Ok(Classification {
        importance: parsed.importance,
        reason: parsed.reason,
        needs_response: parsed.needs_response,
        time_sensitive: parsed.time_sensitive,
        topics,
    })
}

/// Validate raw model output against the category schema. Confidence must
/// lie in `0.0..=1.0`; company and topic may be absent or null.
pub fn parse_category(raw: &str) -> std::result::Result<EmailAnalysis, ClassificationError> {
    let parsed: ModelCategory = decode(raw)?;

    if !(0.0..=1.0).contains(&parsed.confidence) {
        return Err(ClassificationError::Schema(format!("confidence {} is outside 0-1", parsed.confidence)));
    }

    Ok(EmailAnalysis {
        category: parsed.category,
        confidence: parsed.confidence,
        reason: parsed.reason,
        company_name: non_blank(parsed.company_name),
        topic: non_blank(parsed.topic),
    })
}
