//! In-memory collaborators for unit tests

use async_trait::async_trait;
use chrono::Duration;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use crate::categories::{EmailAnalysis, OpportunityCandidate, OpportunityRanker};
use crate::classifier::{parse_category, parse_classification, Categorizer, Classifier, Drafter};
use crate::error::{ClassificationError, Result, TriageError};
use crate::mailbox::Mailbox;
use crate::types::{Classification, Importance, Message, RawMessage, SentRecord};

pub fn classification(importance: Importance, needs_response: bool, time_sensitive: bool) -> Classification {
    Classification {
        importance,
        reason: "test".to_string(),
        needs_response,
        time_sensitive,
        topics: vec!["general".to_string()],
    }
}

#[derive(Default)]
pub struct FakeMailbox {
    pub inbox: Vec<RawMessage>,
    pub sent: Vec<SentRecord>,
    fail_send: bool,
    fail_delete: HashSet<String>,
    sent_mail: Mutex<Vec<(String, String, String)>>,
    deleted: Mutex<Vec<String>>,
}

impl FakeMailbox {
    pub fn failing_send(mut self) -> Self {
        self.fail_send = true;
        self
    }

    pub fn failing_delete(mut self, subject: &str) -> Self {
        self.fail_delete.insert(subject.to_string());
        self
    }

    /// (subject, body, recipient) of every successful send
    pub fn sent_mail(&self) -> Vec<(String, String, String)> {
        self.sent_mail.lock().unwrap().clone()
    }

    pub fn deleted_subjects(&self) -> Vec<String> {
        self.deleted.lock().unwrap().clone()
    }
}

#[async_trait]
impl Mailbox for FakeMailbox {
    async fn fetch_inbox(&self, _since: Duration) -> Result<Vec<RawMessage>> {
        Ok(self.inbox.clone())
    }

    async fn fetch_sent(&self, _since: Duration) -> Result<Vec<SentRecord>> {
        Ok(self.sent.clone())
    }

    async fn send(&self, subject: &str, body: &str, recipient: &str) -> Result<()> {
        if self.fail_send {
            return Err(TriageError::Backend("SMTP unavailable".into()));
        }
        self.sent_mail
            .lock()
            .unwrap()
            .push((subject.to_string(), body.to_string(), recipient.to_string()));
        Ok(())
    }

    async fn delete_matching(&self, subject: &str) -> Result<usize> {
        if self.fail_delete.contains(subject) {
            return Err(TriageError::Backend("SEARCH failed".into()));
        }
        self.deleted.lock().unwrap().push(subject.to_string());
        Ok(1)
    }
}

/// Classifier answering from a subject -> raw model output table.
/// Unknown subjects fail with a transport error.
#[derive(Default)]
pub struct FakeClassifier {
    responses: HashMap<String, String>,
}

impl FakeClassifier {
    pub fn with(mut self, subject: &str, raw: &str) -> Self {
        self.responses.insert(subject.to_string(), raw.to_string());
        self
    }

    pub fn with_classification(self, subject: &str, c: &Classification) -> Self {
        let raw = serde_json::to_string(c).unwrap();
        self.with(subject, &raw)
    }
}

#[async_trait]
impl Classifier for FakeClassifier {
    async fn classify(&self, message: &Message) -> std::result::Result<Classification, ClassificationError> {
        match self.responses.get(&message.subject) {
            Some(raw) => parse_classification(raw),
            None => Err(ClassificationError::Transport("connection refused".into())),
        }
    }
}

/// Categorizer answering from a subject -> raw model output table.
/// Unknown subjects fail with a transport error.
#[derive(Default)]
pub struct FakeCategorizer {
    responses: HashMap<String, String>,
}

impl FakeCategorizer {
    pub fn with(mut self, subject: &str, raw: &str) -> Self {
        self.responses.insert(subject.to_string(), raw.to_string());
        self
    }
}

#[async_trait]
impl Categorizer for FakeCategorizer {
    async fn categorize(&self, message: &Message) -> std::result::Result<EmailAnalysis, ClassificationError> {
        match self.responses.get(&message.subject) {
            Some(raw) => parse_category(raw),
            None => Err(ClassificationError::Transport("connection refused".into())),
        }
    }
}

/// Ranker returning a fixed report and recording what it was shown
#[derive(Default)]
pub struct FakeRanker {
    report: Option<String>,
    seen: Mutex<Vec<OpportunityCandidate>>,
}

impl FakeRanker {
    pub fn new(report: &str) -> Self {
        Self {
            report: Some(report.to_string()),
            ..Default::default()
        }
    }

    pub fn failing() -> Self {
        Self::default()
    }

    pub fn candidates(&self) -> Vec<OpportunityCandidate> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl OpportunityRanker for FakeRanker {
    async fn rank_opportunities(&self, candidates: &[OpportunityCandidate]) -> Result<String> {
        self.seen.lock().unwrap().extend_from_slice(candidates);
        self.report
            .clone()
            .ok_or_else(|| TriageError::Network("model timeout".into()))
    }
}

/// Drafter returning numbered drafts and recording the instructions it saw
#[derive(Default)]
pub struct FakeDrafter {
    fail_after: Option<usize>,
    calls: Mutex<Vec<Option<String>>>,
}

impl FakeDrafter {
    /// Succeed for the first `n` calls, then fail
    pub fn failing_after(n: usize) -> Self {
        Self {
            fail_after: Some(n),
            ..Default::default()
        }
    }

    pub fn calls(&self) -> Vec<Option<String>> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Drafter for FakeDrafter {
    async fn draft_reply(&self, message: &Message, instructions: Option<&str>) -> Result<String> {
        let mut calls = self.calls.lock().unwrap();
        calls.push(instructions.map(str::to_string));
        let n = calls.len();
        if self.fail_after.is_some_and(|limit| n > limit) {
            return Err(TriageError::Network("model timeout".into()));
        }
        Ok(format!("Subject: Re: {}\n\nDraft {}\n\nBest regards", message.subject, n))
    }
}
