//! Interactive response loop
//!
//! Each actionable record runs through a small state machine:
//!
//! ```text
//! Drafted --accept--> Sending --ok--> Sent
//!    |                   \--err--> Skipped(SendFailed)
//!    |--reject/skip--> Skipped
//!    \--edit--> Editing --redrafted--> Drafted
//! ```
//!
//! `transition` is pure. `ResponseLoop` is the thin shell that performs the
//! blocking calls (drafting, sending, asking the human) and feeds their
//! outcomes back in as events. Edits are unbounded and sends are never
//! retried.

use tracing::{error, info, warn};

use crate::classifier::Drafter;
use crate::error::{Result, TriageError};
use crate::mailbox::Mailbox;
use crate::state::{ResponseHistoryEntry, ResponseHistoryStore};
use crate::types::ActionableRecord;

/// A reply ready for review
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Draft {
    pub subject: String,
    pub body: String,
}

impl Draft {
    /// Split model output into subject and body.
    ///
    /// The model is asked to start with `Subject: ...`; without that line the
    /// whole text is the body and the subject is `Re: <original>`.
    pub fn parse(text: &str, original_subject: &str) -> Self {
        let text = text.trim();
        let (first, rest) = text.split_once('\n').unwrap_or((text, ""));

        match first.trim().strip_prefix("Subject:") {
            Some(subject) if !subject.trim().is_empty() => Self {
                subject: subject.trim().to_string(),
                body: rest.trim().to_string(),
            },
            _ => Self {
                subject: format!("Re: {}", original_subject),
                body: text.to_string(),
            },
        }
    }
}

/// Human decision on a draft
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Accept,
    Reject,
    Skip,
    Edit(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    Rejected,
    MarkedSkip,
    SendFailed,
    NoRecipient,
    DraftFailed,
    AlreadyResponded,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseState {
    Drafted(Draft),
    Sending(Draft),
    Editing { draft: Draft, instructions: String },
    Sent,
    Skipped(SkipReason),
}

impl ResponseState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Sent | Self::Skipped(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Decided(Decision),
    SendSucceeded,
    SendFailed,
    Redrafted(Draft),
    RedraftFailed,
}

/// Next state for `event`, or an error if the event does not apply.
pub fn transition(state: ResponseState, event: Event) -> Result<ResponseState> {
    use ResponseState::*;

    let next = match (state, event) {
        (Drafted(draft), Event::Decided(decision)) => match decision {
            Decision::Accept => Sending(draft),
            Decision::Reject => Skipped(SkipReason::Rejected),
            Decision::Skip => Skipped(SkipReason::MarkedSkip),
            Decision::Edit(instructions) => Editing { draft, instructions },
        },
        (Sending(_), Event::SendSucceeded) => Sent,
        (Sending(_), Event::SendFailed) => Skipped(SkipReason::SendFailed),
        (Editing { .. }, Event::Redrafted(new_draft)) => Drafted(new_draft),
        // keep the previous draft
        (Editing { draft, .. }, Event::RedraftFailed) => Drafted(draft),
        (state, event) => {
            return Err(TriageError::InvalidInput(format!(
                "event {:?} does not apply in state {:?}",
                event, state
            )))
        }
    };

    Ok(next)
}

/// Source of human decisions; implementations may block on input.
pub trait DecisionSource {
    /// Review `draft` for `record`.
    fn decide(&mut self, record: &ActionableRecord, recipient: Option<&str>, draft: &Draft) -> Decision;

    /// Whether to draft a reply for a record that was already answered.
    fn confirm_already_responded(&mut self, record: &ActionableRecord) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseOutcome {
    Sent,
    Skipped(SkipReason),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoopSummary {
    pub sent: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Drives the state machine against the real collaborators
pub struct ResponseLoop<'a, D: ?Sized, M: ?Sized> {
    drafter: &'a D,
    mailbox: &'a M,
    history: &'a ResponseHistoryStore,
}

impl<'a, D, M> ResponseLoop<'a, D, M>
where
    D: Drafter + ?Sized,
    M: Mailbox + ?Sized,
{
    pub fn new(drafter: &'a D, mailbox: &'a M, history: &'a ResponseHistoryStore) -> Self {
        Self {
            drafter,
            mailbox,
            history,
        }
    }

    /// Process every record in order.
    pub async fn run(&self, records: &[ActionableRecord], decisions: &mut dyn DecisionSource) -> LoopSummary {
        let fresh = records.iter().filter(|r| !r.already_responded).count();
        info!(
            total = records.len(),
            new = fresh,
            already_responded = records.len() - fresh,
            "Processing emails requiring response"
        );

        let mut summary = LoopSummary::default();
        for (i, record) in records.iter().enumerate() {
            info!(index = i + 1, total = records.len(), subject = %record.message.subject, "Reviewing email");
            match self.respond(record, decisions).await {
                ResponseOutcome::Sent => summary.sent += 1,
                ResponseOutcome::Skipped(SkipReason::SendFailed | SkipReason::DraftFailed) => {
                    summary.failed += 1
                }
                ResponseOutcome::Skipped(_) => summary.skipped += 1,
            }
        }

        info!(sent = summary.sent, skipped = summary.skipped, failed = summary.failed, "All emails processed");
        summary
    }

    /// Run one record to a terminal state.
    pub async fn respond(&self, record: &ActionableRecord, decisions: &mut dyn DecisionSource) -> ResponseOutcome {
        let message = &record.message;

        if record.already_responded && !decisions.confirm_already_responded(record) {
            info!(subject = %message.subject, "Already responded, skipping");
            return ResponseOutcome::Skipped(SkipReason::AlreadyResponded);
        }

        let mut state = match self.drafter.draft_reply(message, None).await {
            Ok(text) => ResponseState::Drafted(Draft::parse(&text, &message.subject)),
            Err(e) => {
                error!(subject = %message.subject, error = %e, "Failed to generate a response");
                return ResponseOutcome::Skipped(SkipReason::DraftFailed);
            }
        };

        loop {
            let event = match &state {
                ResponseState::Drafted(draft) => {
                    Event::Decided(decisions.decide(record, message.from_address.as_deref(), draft))
                }
                ResponseState::Sending(draft) => {
                    let Some(recipient) = message.from_address.as_deref() else {
                        error!(subject = %message.subject, "No email address found for recipient");
                        return ResponseOutcome::Skipped(SkipReason::NoRecipient);
                    };
                    self.send(record, recipient, draft).await
                }
                ResponseState::Editing { instructions, .. } => {
                    info!("Generating new response from edit instructions");
                    match self.drafter.draft_reply(message, Some(instructions.as_str())).await {
                        Ok(text) => Event::Redrafted(Draft::parse(&text, &message.subject)),
                        Err(e) => {
                            warn!(error = %e, "Failed to generate edited response, keeping previous draft");
                            Event::RedraftFailed
                        }
                    }
                }
                ResponseState::Sent => return ResponseOutcome::Sent,
                ResponseState::Skipped(reason) => {
                    info!(subject = %message.subject, reason = ?reason, "Skipped");
                    return ResponseOutcome::Skipped(*reason);
                }
            };

            state = match transition(state, event) {
                Ok(next) => next,
                Err(e) => {
                    // unreachable with the events produced above
                    error!(error = %e, "Invalid response state transition");
                    return ResponseOutcome::Skipped(SkipReason::MarkedSkip);
                }
            };
        }
    }

    async fn send(&self, record: &ActionableRecord, recipient: &str, draft: &Draft) -> Event {
        info!(recipient = %recipient, "Sending email");
        match self.mailbox.send(&draft.subject, &draft.body, recipient).await {
            Ok(()) => {
                info!("Email sent successfully");
                let entry = ResponseHistoryEntry::now(
                    record.message.subject.clone(),
                    record.message.from_display.clone(),
                );
                if let Err(e) = self.history.append(entry) {
                    error!(error = %e, "Sent, but could not record the response in history");
                }
                Event::SendSucceeded
            }
            Err(e) => {
                error!(recipient = %recipient, error = %e, "Failed to send email");
                Event::SendFailed
            }
        }
    }
}
