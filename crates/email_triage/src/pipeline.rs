//! Classification pipeline
//!
//! Runs the classifier over every message, one at a time. A failed
//! classification is logged and the message is left out; it never counts as
//! "needs response". Two independent effects come out of a successful
//! classification:
//!
//! - `needs_response` puts the message in the actionable set, whatever its
//!   importance
//! - `low` importance without time sensitivity queues a deletion review task

use tracing::{debug, info, warn};

use crate::classifier::Classifier;
use crate::correlator::already_responded;
use crate::state::{DeletionQueue, DeletionTask};
use crate::types::{ActionableRecord, Classification, Importance, Message, SentRecord};

/// Counts for one pipeline run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub processed: usize,
    pub failed: usize,
    pub needs_response: usize,
    pub already_responded: usize,
    pub queued_for_deletion: usize,
}

impl RunSummary {
    pub fn new_requiring_response(&self) -> usize {
        self.needs_response - self.already_responded
    }
}

#[derive(Debug, Clone, Default)]
pub struct PipelineOutput {
    /// Records needing a response, in input order
    pub actionable: Vec<ActionableRecord>,
    pub summary: RunSummary,
}

/// Deletion review policy
pub fn should_queue_for_deletion(classification: &Classification) -> bool {
    classification.importance == Importance::Low && !classification.time_sensitive
}

/// Classify `messages`, correlate against `sent`, and queue deletions.
///
/// Deletion tasks go to `deletion_queue` when one is given; a failure to
/// write the queue is logged and does not stop the batch.
pub async fn classify_all<C>(
    messages: &[Message],
    sent: &[SentRecord],
    classifier: &C,
    deletion_queue: Option<&DeletionQueue>,
) -> PipelineOutput
where
    C: Classifier + ?Sized,
{
    let mut output = PipelineOutput::default();

    for message in messages {
        output.summary.processed += 1;

        let classification = match classifier.classify(message).await {
            Ok(c) => c,
            Err(e) => {
                output.summary.failed += 1;
                warn!(subject = %message.subject, error = %e, "Classification failed, skipping message");
                continue;
            }
        };

        debug!(
            subject = %message.subject,
            importance = classification.importance.as_str(),
            needs_response = classification.needs_response,
            time_sensitive = classification.time_sensitive,
            "Classified"
        );

        if should_queue_for_deletion(&classification) {
            if let Some(queue) = deletion_queue {
                let task = DeletionTask::new(
                    message.subject.clone(),
                    message.from_display.clone(),
                    message.received_at.clone(),
                );
                match queue.upsert_task(task) {
                    Ok(true) => output.summary.queued_for_deletion += 1,
                    Ok(false) => {}
                    Err(e) => warn!(subject = %message.subject, error = %e, "Could not queue deletion task"),
                }
            }
        }

        if !classification.needs_response {
            continue;
        }

        let responded = already_responded(message, sent);
        output.summary.needs_response += 1;
        if responded {
            output.summary.already_responded += 1;
        }

        output.actionable.push(ActionableRecord {
            message: message.clone(),
            classification,
            already_responded: responded,
        });
    }

    info!(
        processed = output.summary.processed,
        needs_response = output.summary.needs_response,
        already_responded = output.summary.already_responded,
        failed = output.summary.failed,
        queued_for_deletion = output.summary.queued_for_deletion,
        "Classification run complete"
    );

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::DeletionStatus;
    use crate::testing::{classification, FakeClassifier};

    fn msg(subject: &str) -> Message {
        Message::new(subject, "Ann <ann@co.com>", Some("today".into()), "body")
    }

    #[tokio::test]
    async fn test_inclusion_follows_needs_response_only() {
        let classifier = FakeClassifier::default()
            .with_classification("low but needs reply", &classification(Importance::Low, true, false))
            .with_classification("high but no reply", &classification(Importance::High, false, true));
        let messages = vec![msg("low but needs reply"), msg("high but no reply")];

        let out = classify_all(&messages, &[], &classifier, None).await;

        assert_eq!(out.actionable.len(), 1);
        assert_eq!(out.actionable[0].message.subject, "low but needs reply");
        assert_eq!(out.summary.processed, 2);
        assert_eq!(out.summary.needs_response, 1);
    }

    #[tokio::test]
    async fn test_failures_are_skipped_not_fatal() {
        let classifier = FakeClassifier::default()
            .with("garbage", "not json at all")
            .with("missing", r#"{"importance":"high","reason":"x"}"#)
            .with_classification("good", &classification(Importance::Medium, true, false));
        let messages = vec![msg("garbage"), msg("unreachable"), msg("missing"), msg("good")];

        let out = classify_all(&messages, &[], &classifier, None).await;

        assert_eq!(out.summary.failed, 3);
        assert_eq!(out.actionable.len(), 1);
        assert_eq!(out.actionable[0].message.subject, "good");
    }

    #[tokio::test]
    async fn test_already_responded_is_correlated() {
        let classifier = FakeClassifier::default()
            .with_classification("Invoice #4", &classification(Importance::High, true, true))
            .with_classification("Lunch", &classification(Importance::Medium, true, false));
        let sent = vec![SentRecord::new("Re: Invoice #4", ["ann@co.com"], "")];

        let out = classify_all(&[msg("Invoice #4"), msg("Lunch")], &sent, &classifier, None).await;

        assert!(out.actionable[0].already_responded);
        assert!(!out.actionable[1].already_responded);
        assert_eq!(out.summary.already_responded, 1);
        assert_eq!(out.summary.new_requiring_response(), 1);
    }

    #[tokio::test]
    async fn test_low_routine_messages_are_queued_for_review() {
        let dir = tempfile::tempdir().unwrap();
        let queue = DeletionQueue::new(dir.path().join("to_delete.json"));
        let classifier = FakeClassifier::default()
            .with_classification("promo", &classification(Importance::Low, false, false))
            .with_classification("low urgent", &classification(Importance::Low, false, true))
            .with_classification("low reply", &classification(Importance::Low, true, false))
            .with_classification("medium", &classification(Importance::Medium, false, false));
        let messages = vec![msg("promo"), msg("low urgent"), msg("low reply"), msg("medium")];

        let out = classify_all(&messages, &[], &classifier, Some(&queue)).await;

        let tasks = queue.load_tasks();
        let subjects: Vec<_> = tasks.iter().map(|t| t.subject.as_str()).collect();
        assert_eq!(subjects, vec!["promo", "low reply"]);
        assert!(tasks.iter().all(|t| t.status == DeletionStatus::ToReview));
        assert_eq!(tasks[0].received.as_deref(), Some("today"));
        assert_eq!(out.summary.queued_for_deletion, 2);
        // queued for deletion and still actionable
        assert_eq!(out.actionable.len(), 1);
        assert_eq!(out.actionable[0].message.subject, "low reply");
    }

    #[tokio::test]
    async fn test_rerun_does_not_duplicate_tasks() {
        let dir = tempfile::tempdir().unwrap();
        let queue = DeletionQueue::new(dir.path().join("to_delete.json"));
        let classifier = FakeClassifier::default()
            .with_classification("promo", &classification(Importance::Low, false, false));
        let messages = vec![msg("promo")];

        classify_all(&messages, &[], &classifier, Some(&queue)).await;
        let second = classify_all(&messages, &[], &classifier, Some(&queue)).await;

        assert_eq!(queue.load_tasks().len(), 1);
        assert_eq!(second.summary.queued_for_deletion, 0);
    }
}
