//! Deletion queue
//!
//! Low-value messages are queued as `to review`. A human moves them to
//! `to delete`, and the sweep removes matching inbox messages and marks the
//! task `deleted`. Tasks only ever move forward and are never removed from
//! the file. Entries this version does not understand, including unknown
//! statuses, are kept in the file as they are and never acted on.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use super::{read_json, valid_entries, write_json, Stored};
use crate::error::{Result, TriageError};
use crate::mailbox::Mailbox;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum DeletionStatus {
    ToReview,
    ToDelete,
    Deleted,
    /// Any other status string, written back verbatim
    Unknown(String),
}

impl DeletionStatus {
    pub fn as_str(&self) -> &str {
        match self {
            Self::ToReview => "to review",
            Self::ToDelete => "to delete",
            Self::Deleted => "deleted",
            Self::Unknown(other) => other,
        }
    }
}

impl From<String> for DeletionStatus {
    fn from(value: String) -> Self {
        match value.as_str() {
            "to review" => Self::ToReview,
            "to delete" => Self::ToDelete,
            "deleted" => Self::Deleted,
            _ => Self::Unknown(value),
        }
    }
}

impl From<DeletionStatus> for String {
    fn from(status: DeletionStatus) -> Self {
        match status {
            DeletionStatus::Unknown(other) => other,
            known => known.as_str().to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletionTask {
    pub subject: String,
    pub from: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub received: Option<String>,
    pub status: DeletionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<String>,
}

impl DeletionTask {
    pub fn new(subject: impl Into<String>, from: impl Into<String>, received: Option<String>) -> Self {
        Self {
            subject: subject.into(),
            from: from.into(),
            received,
            status: DeletionStatus::ToReview,
            deleted_at: None,
        }
    }

    /// Tasks are identified informally by subject and sender.
    pub fn same_message(&self, other: &DeletionTask) -> bool {
        self.subject == other.subject && self.from == other.from
    }

    /// `to review` -> `to delete`
    pub fn approve(&mut self) -> Result<()> {
        if self.status == DeletionStatus::ToReview {
            self.status = DeletionStatus::ToDelete;
            return Ok(());
        }
        Err(TriageError::InvalidInput(format!(
            "cannot approve a task in status '{}'",
            self.status.as_str()
        )))
    }

    /// `to delete` -> `deleted`. Any other status is left alone.
    pub fn mark_deleted(&mut self, at: impl Into<String>) -> bool {
        if self.status != DeletionStatus::ToDelete {
            return false;
        }
        self.status = DeletionStatus::Deleted;
        self.deleted_at = Some(at.into());
        true
    }
}

/// File-backed task list
#[derive(Debug, Clone)]
pub struct DeletionQueue {
    path: PathBuf,
}

impl DeletionQueue {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Tasks for display. A missing or unreadable file reads as empty.
    pub fn load_tasks(&self) -> Vec<DeletionTask> {
        match self.load_stored() {
            Ok(stored) => valid_entries(&stored, &self.path),
            Err(e) => {
                warn!(error = %e, "Treating deletion queue as empty");
                Vec::new()
            }
        }
    }

    pub fn save_tasks(&self, tasks: &[DeletionTask]) -> Result<()> {
        write_json(&self.path, tasks)
    }

    /// Every entry in file order. Fails rather than guessing when the file
    /// is not a JSON list.
    fn load_stored(&self) -> Result<Vec<Stored<DeletionTask>>> {
        Ok(read_json(&self.path)?.unwrap_or_default())
    }

    fn save_stored(&self, stored: &[Stored<DeletionTask>]) -> Result<()> {
        write_json(&self.path, stored)
    }

    /// Add `task` unless a task for the same subject and sender exists.
    /// Existing tasks keep their status. Returns whether a task was added.
    pub fn upsert_task(&self, task: DeletionTask) -> Result<bool> {
        let mut stored = self.load_stored()?;
        if stored.iter().filter_map(Stored::valid).any(|t| t.same_message(&task)) {
            return Ok(false);
        }
        info!(subject = %task.subject, "Queued for deletion review");
        stored.push(Stored::new(task));
        self.save_stored(&stored)?;
        Ok(true)
    }

    /// Approve the tasks at `indices` (positions in [`load_tasks`]). Returns
    /// how many moved to `to delete`; tasks in other states are reported and
    /// skipped.
    ///
    /// [`load_tasks`]: DeletionQueue::load_tasks
    pub fn approve(&self, indices: &[usize]) -> Result<usize> {
        let mut stored = self.load_stored()?;
        let mut tasks: Vec<&mut DeletionTask> = stored.iter_mut().filter_map(Stored::valid_mut).collect();
        let mut approved = 0;

        for &index in indices {
            let Some(task) = tasks.get_mut(index) else {
                return Err(TriageError::InvalidInput(format!("no task at index {}", index)));
            };
            match task.approve() {
                Ok(()) => approved += 1,
                Err(e) => warn!(index, subject = %task.subject, "{}", e),
            }
        }

        if approved > 0 {
            self.save_stored(&stored)?;
        }
        Ok(approved)
    }

    /// Approve every task still in `to review`.
    pub fn approve_all(&self) -> Result<usize> {
        let pending: Vec<usize> = self
            .load_stored()?
            .iter()
            .filter_map(Stored::valid)
            .enumerate()
            .filter(|(_, t)| t.status == DeletionStatus::ToReview)
            .map(|(i, _)| i)
            .collect();
        self.approve(&pending)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepSummary {
    pub attempted: usize,
    pub deleted: usize,
    pub failed: usize,
}

/// Delete every `to delete` task's messages and mark it `deleted`.
///
/// A failed delete leaves the task in `to delete` for the next sweep. The
/// task file is rewritten only when something changed.
pub async fn process_deletions<M>(queue: &DeletionQueue, mailbox: &M) -> Result<SweepSummary>
where
    M: Mailbox + ?Sized,
{
    let mut stored = queue.load_stored()?;
    let mut summary = SweepSummary::default();

    for task in stored.iter_mut().filter_map(Stored::valid_mut) {
        if task.status != DeletionStatus::ToDelete {
            continue;
        }
        summary.attempted += 1;
        info!(subject = %task.subject, "Deleting");

        match mailbox.delete_matching(&task.subject).await {
            Ok(count) => {
                task.mark_deleted(Utc::now().to_rfc3339());
                summary.deleted += 1;
                info!(subject = %task.subject, messages = count, "Deleted");
            }
            Err(e) => {
                summary.failed += 1;
                warn!(subject = %task.subject, error = %e, "Failed to delete");
            }
        }
    }

    if summary.deleted > 0 {
        queue.save_stored(&stored)?;
    }
    Ok(summary)
}
