//! Work item entity.

use super::status::WorkItemStatus;
use crate::{BatchResult, JobId, WorkItemId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One subject's unit of work within a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkItem {
    pub id: WorkItemId,
    pub job_id: JobId,
    pub subject: String,
    pub status: WorkItemStatus,
    /// Number of leases that claimed this item. Never decreases.
    pub attempts: u32,
    pub artifact_path: Option<String>,
    pub artifact_url: Option<String>,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl WorkItem {
    /// Creates a queued item with no attempts.
    #[must_use]
    pub fn new(job_id: JobId, subject: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: WorkItemId::new(),
            job_id,
            subject: subject.into(),
            status: WorkItemStatus::Queued,
            attempts: 0,
            artifact_path: None,
            artifact_url: None,
            error: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Done with a published artifact.
    #[must_use]
    pub const fn is_completed(&self) -> bool {
        matches!(self.status, WorkItemStatus::Done) && self.artifact_url.is_some()
    }

    /// Applies a change after checking the edge is legal.
    pub fn apply(&mut self, change: WorkItemChange) -> BatchResult<()> {
        self.status = self.status.transition_to(change.target())?;
        match change {
            WorkItemChange::Claim => self.attempts += 1,
            WorkItemChange::Complete {
                artifact_path,
                artifact_url,
            } => {
                self.artifact_path = Some(artifact_path);
                self.artifact_url = Some(artifact_url);
                self.error = None;
            }
            WorkItemChange::Release { error } | WorkItemChange::Fail { error } => {
                self.error = Some(error);
            }
            WorkItemChange::Cancel => {}
        }
        self.updated_at = Utc::now();
        Ok(())
    }
}

/// A conditional status write on a work item.
///
/// Stores apply a change only when the row is still in the status the
/// caller observed, which makes every write a compare-and-swap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkItemChange {
    /// `queued -> running`, increments `attempts`.
    Claim,
    /// `running -> done` with the uploaded artifact, clears `error`.
    Complete {
        artifact_path: String,
        artifact_url: String,
    },
    /// `running -> queued` after a recoverable failure.
    Release { error: String },
    /// Terminal failure.
    Fail { error: String },
    Cancel,
}

impl WorkItemChange {
    /// Status the item ends up in.
    #[must_use]
    pub const fn target(&self) -> WorkItemStatus {
        match self {
            Self::Claim => WorkItemStatus::Running,
            Self::Complete { .. } => WorkItemStatus::Done,
            Self::Release { .. } => WorkItemStatus::Queued,
            Self::Fail { .. } => WorkItemStatus::Error,
            Self::Cancel => WorkItemStatus::Cancelled,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_claim_increments_attempts() {
        let mut item = WorkItem::new(JobId::new(), "cat");
        item.apply(WorkItemChange::Claim).unwrap();
        assert_eq!(item.status, WorkItemStatus::Running);
        assert_eq!(item.attempts, 1);
    }

    #[test]
    fn test_release_keeps_attempts_and_records_error() {
        let mut item = WorkItem::new(JobId::new(), "cat");
        item.apply(WorkItemChange::Claim).unwrap();
        item.apply(WorkItemChange::Release {
            error: "timeout".into(),
        })
        .unwrap();
        assert_eq!(item.status, WorkItemStatus::Queued);
        assert_eq!(item.attempts, 1);
        assert_eq!(item.error.as_deref(), Some("timeout"));
    }

    #[test]
    fn test_complete_clears_error() {
        let mut item = WorkItem::new(JobId::new(), "dog");
        item.apply(WorkItemChange::Claim).unwrap();
        item.error = Some("earlier failure".into());
        item.apply(WorkItemChange::Complete {
            artifact_path: "a/b.png".into(),
            artifact_url: "https://cdn/a/b.png".into(),
        })
        .unwrap();
        assert!(item.is_completed());
        assert!(item.error.is_none());
    }

    #[test]
    fn test_done_item_cannot_be_claimed() {
        let mut item = WorkItem::new(JobId::new(), "dog");
        item.apply(WorkItemChange::Claim).unwrap();
        item.apply(WorkItemChange::Complete {
            artifact_path: "p".into(),
            artifact_url: "u".into(),
        })
        .unwrap();
        assert!(item.apply(WorkItemChange::Claim).is_err());
        assert_eq!(item.attempts, 1);
    }
}
