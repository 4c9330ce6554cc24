//! In-memory collaborators for command tests.

use async_trait::async_trait;
use chrono::Duration;
use std::collections::HashMap;
use std::sync::Mutex;

use email_triage::categories::{EmailAnalysis, EmailCategory, OpportunityCandidate, OpportunityRanker};
use email_triage::classifier::{Categorizer, Classifier, Drafter};
use email_triage::mailbox::Mailbox;
use email_triage::{Classification, ClassificationError, Importance, Message, RawMessage, Result, SentRecord, TriageError};

pub fn classification(importance: Importance, needs_response: bool, time_sensitive: bool, topics: &[&str]) -> Classification {
    Classification {
        importance,
        reason: "test".into(),
        needs_response,
        time_sensitive,
        topics: topics.iter().map(|t| t.to_string()).collect(),
    }
}

#[derive(Default)]
pub struct FakeMailbox {
    inbox: Vec<RawMessage>,
    sent: Vec<SentRecord>,
    fail_sent: bool,
    fail_delete: Vec<String>,
    pub outbox: Mutex<Vec<(String, String, String)>>,
    pub deleted: Mutex<Vec<String>>,
}

impl FakeMailbox {
    pub fn with_inbox(mut self, inbox: Vec<RawMessage>) -> Self {
        self.inbox = inbox;
        self
    }

    pub fn with_sent(mut self, sent: Vec<SentRecord>) -> Self {
        self.sent = sent;
        self
    }

    pub fn failing_sent(mut self) -> Self {
        self.fail_sent = true;
        self
    }

    pub fn failing_delete(mut self, subject: &str) -> Self {
        self.fail_delete.push(subject.to_string());
        self
    }

    pub fn deleted(&self) -> Vec<String> {
        self.deleted.lock().unwrap().clone()
    }
}

#[async_trait]
impl Mailbox for FakeMailbox {
    async fn fetch_inbox(&self, _since: Duration) -> Result<Vec<RawMessage>> {
        Ok(self.inbox.clone())
    }

    async fn fetch_sent(&self, _since: Duration) -> Result<Vec<SentRecord>> {
        if self.fail_sent {
            return Err(TriageError::Backend("SELECT failed".into()));
        }
        Ok(self.sent.clone())
    }

    async fn send(&self, subject: &str, body: &str, recipient: &str) -> Result<()> {
        self.outbox
            .lock()
            .unwrap()
            .push((subject.to_string(), body.to_string(), recipient.to_string()));
        Ok(())
    }

    async fn delete_matching(&self, subject: &str) -> Result<usize> {
        if self.fail_delete.iter().any(|s| s == subject) {
            return Err(TriageError::Network("connection reset".into()));
        }
        self.deleted.lock().unwrap().push(subject.to_string());
        Ok(1)
    }
}

/// Classifies by exact subject; anything else is a transport failure.
#[derive(Default)]
pub struct FakeClassifier {
    by_subject: HashMap<String, Classification>,
}

impl FakeClassifier {
    pub fn with(mut self, subject: &str, classification: Classification) -> Self {
        self.by_subject.insert(subject.to_string(), classification);
        self
    }
}

#[async_trait]
impl Classifier for FakeClassifier {
    async fn classify(&self, message: &Message) -> std::result::Result<Classification, ClassificationError> {
        self.by_subject
            .get(&message.subject)
            .cloned()
            .ok_or_else(|| ClassificationError::Transport("unreachable".into()))
    }
}

/// Categorizes by exact subject; anything else is a transport failure.
#[derive(Default)]
pub struct FakeCategorizer {
    by_subject: HashMap<String, EmailAnalysis>,
}

impl FakeCategorizer {
    pub fn with(mut self, subject: &str, category: EmailCategory, confidence: f64) -> Self {
        let analysis = EmailAnalysis {
            category,
            confidence,
            reason: "test".into(),
            company_name: None,
            topic: None,
        };
        self.by_subject.insert(subject.to_string(), analysis);
        self
    }
}

#[async_trait]
impl Categorizer for FakeCategorizer {
    async fn categorize(&self, message: &Message) -> std::result::Result<EmailAnalysis, ClassificationError> {
        self.by_subject
            .get(&message.subject)
            .cloned()
            .ok_or_else(|| ClassificationError::Transport("unreachable".into()))
    }
}

/// Returns a fixed report body and records the subjects it ranked.
pub struct FakeRanker {
    report: String,
    seen: Mutex<Vec<String>>,
}

impl FakeRanker {
    pub fn new(report: &str) -> Self {
        Self {
            report: report.to_string(),
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn subjects(&self) -> Vec<String> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl OpportunityRanker for FakeRanker {
    async fn rank_opportunities(&self, candidates: &[OpportunityCandidate]) -> Result<String> {
        self.seen
            .lock()
            .unwrap()
            .extend(candidates.iter().map(|c| c.subject.clone()));
        Ok(self.report.clone())
    }
}

pub struct FakeDrafter;

#[async_trait]
impl Drafter for FakeDrafter {
    async fn draft_reply(&self, message: &Message, _instructions: Option<&str>) -> Result<String> {
        Ok(format!("Subject: Re: {}\n\nThanks!", message.subject))
    }
}
