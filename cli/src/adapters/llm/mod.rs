//! OpenAI-compatible chat completions.

pub mod prompts;

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

use email_triage::categories::{EmailAnalysis, OpportunityCandidate, OpportunityRanker};
use email_triage::classifier::{parse_category, parse_classification, Categorizer, Classifier, Drafter};
use email_triage::{Classification, ClassificationError, Message, TriageError};

use crate::config::LlmConfig;

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Client for `/v1/chat/completions`, used to classify, categorize, rank
/// opportunities and draft.
pub struct LlmClient {
    http: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: Option<String>,
    signature: String,
}

impl LlmClient {
    pub fn new(config: &LlmConfig, signature: impl Into<String>) -> Result<Self, TriageError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| TriageError::Config(format!("HTTP client error: {}", e)))?;

        if config.api_key.is_none() {
            warn!(url = %config.url, "No LLM API key configured, sending unauthenticated requests");
        }

        Ok(Self {
            http,
            endpoint: format!("{}/v1/chat/completions", config.url.trim_end_matches('/')),
            model: config.model.clone(),
            api_key: config.api_key.clone(),
            signature: signature.into(),
        })
    }

    /// One chat completion. `json_mode` asks for a JSON object response.
    pub async fn chat_complete(&self, system_prompt: &str, user_prompt: &str, json_mode: bool) -> Result<String, TriageError> {
        let mut body = serde_json::json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": system_prompt },
                { "role": "user", "content": user_prompt }
            ],
            "stream": false
        });
        if json_mode {
            body["response_format"] = serde_json::json!({ "type": "json_object" });
        }

        let mut request = self.http.post(&self.endpoint).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let resp = request
            .send()
            .await
            .map_err(|e| TriageError::Network(format!("LLM request failed: {}", e)))?;

        let status = resp.status();
        if !status.is_success() {
            let detail = resp.text().await.unwrap_or_default();
            return Err(TriageError::Backend(format!("LLM returned {}: {}", status, detail.trim())));
        }

        let parsed: ChatResponse = resp
            .json()
            .await
            .map_err(|e| TriageError::Parse(format!("Failed to parse LLM response: {}", e)))?;

        let text = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();

        debug!(chars = text.len(), "LLM response received");
        Ok(text)
    }
}

#[async_trait]
impl Classifier for LlmClient {
    async fn classify(&self, message: &Message) -> Result<Classification, ClassificationError> {
        let raw = self
            .chat_complete(prompts::CLASSIFY_SYSTEM, &prompts::classify(message), true)
            .await
            .map_err(|e| ClassificationError::Transport(e.to_string()))?;

        parse_classification(&raw)
    }
}

#[async_trait]
impl Categorizer for LlmClient {
    async fn categorize(&self, message: &Message) -> Result<EmailAnalysis, ClassificationError> {
        let raw = self
            .chat_complete(prompts::CATEGORIZE_SYSTEM, &prompts::categorize(message), true)
            .await
            .map_err(|e| ClassificationError::Transport(e.to_string()))?;

        parse_category(&raw)
    }
}

#[async_trait]
impl OpportunityRanker for LlmClient {
    async fn rank_opportunities(&self, candidates: &[OpportunityCandidate]) -> email_triage::Result<String> {
        let text = self
            .chat_complete(prompts::OPPORTUNITY_SYSTEM, &prompts::opportunities(candidates), false)
            .await?;
        if text.trim().is_empty() {
            return Err(TriageError::Backend("LLM returned an empty opportunity report".into()));
        }
        Ok(text)
    }
}

#[async_trait]
impl Drafter for LlmClient {
    async fn draft_reply(&self, message: &Message, instructions: Option<&str>) -> email_triage::Result<String> {
        let prompt = match instructions {
            Some(instructions) => prompts::rewrite(message, instructions, &self.signature),
            None => prompts::draft(message, &self.signature),
        };

        let text = self.chat_complete(prompts::DRAFT_SYSTEM, &prompt, false).await?;
        if text.trim().is_empty() {
            return Err(TriageError::Backend("LLM returned an empty draft".into()));
        }
        Ok(text)
    }
}
