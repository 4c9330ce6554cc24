use std::fmt::Write as _;

use email_triage::state::{DeletionQueue, DeletionTask};
use email_triage::{Result, TriageError};
use tracing::info;

use super::TO_DELETE_FILE;
use crate::config::AppConfig;

pub fn list(config: &AppConfig) -> Result<()> {
    let queue = DeletionQueue::new(config.output_path(TO_DELETE_FILE));
    print!("{}", render_tasks(&queue.load_tasks()));
    Ok(())
}

/// Move `to review` tasks to `to delete`. `numbers` are 1-based, as listed.
pub fn approve(config: &AppConfig, numbers: &[usize], all: bool) -> Result<()> {
    let queue = DeletionQueue::new(config.output_path(TO_DELETE_FILE));

    let approved = if all {
        queue.approve_all()?
    } else {
        queue.approve(&to_indices(numbers)?)?
    };

    info!(approved = approved, "Deletion tasks approved");
    println!("{} task(s) approved for deletion. Run `sweep` to delete them.", approved);
    Ok(())
}

fn to_indices(numbers: &[usize]) -> Result<Vec<usize>> {
    if numbers.is_empty() {
        return Err(TriageError::InvalidInput("give task numbers or --all".into()));
    }
    numbers
        .iter()
        .map(|&n| {
            n.checked_sub(1)
                .ok_or_else(|| TriageError::InvalidInput("task numbers start at 1".into()))
        })
        .collect()
}

fn render_tasks(tasks: &[DeletionTask]) -> String {
    let mut out = String::new();
    if tasks.is_empty() {
        let _ = writeln!(out, "No deletion tasks.");
        return out;
    }

    for (i, task) in tasks.iter().enumerate() {
        let _ = write!(out, "{:>3}. [{}] {} ({})", i + 1, task.status.as_str(), task.subject, task.from);
        if let Some(at) = &task.deleted_at {
            let _ = write!(out, " deleted {}", at);
        } else if let Some(received) = &task.received {
            let _ = write!(out, " received {}", received);
        }
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use email_triage::state::DeletionStatus;

    #[test]
    fn test_numbers_are_one_based() {
        assert_eq!(to_indices(&[1, 3]).unwrap(), vec![0, 2]);
        assert!(to_indices(&[0]).is_err());
        assert!(to_indices(&[]).is_err());
    }

    #[test]
    fn test_approve_by_number() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = AppConfig::default();
        config.triage.output_dir = dir.path().to_path_buf();
        let queue = DeletionQueue::new(config.output_path(TO_DELETE_FILE));
        queue
            .save_tasks(&[
                DeletionTask::new("a", "x@y.com", None),
                DeletionTask::new("b", "x@y.com", None),
            ])
            .unwrap();

        approve(&config, &[2], false).unwrap();

        let statuses: Vec<_> = queue.load_tasks().into_iter().map(|t| t.status).collect();
        assert_eq!(statuses, vec![DeletionStatus::ToReview, DeletionStatus::ToDelete]);
    }

    #[test]
    fn test_render_tasks() {
        let mut done = DeletionTask::new("Weekly deals", "shop@deals.com", Some("Mon".into()));
        done.approve().unwrap();
        done.mark_deleted("2025-01-06T09:00:00+00:00");
        let pending = DeletionTask::new("Newsletter", "news@site.com", Some("Tue".into()));

        let text = render_tasks(&[done, pending]);
        assert!(text.contains("  1. [deleted] Weekly deals (shop@deals.com) deleted 2025-01-06T09:00:00+00:00"));
        assert!(text.contains("  2. [to review] Newsletter (news@site.com) received Tue"));
        assert_eq!(render_tasks(&[]), "No deletion tasks.\n");
    }
}
