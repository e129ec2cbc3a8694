//! Job entity.

use super::status::JobStatus;
use crate::{BatchResult, JobId, StyleId, SubjectListId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A batch request to generate one artifact per subject under one style.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub style_id: StyleId,
    pub subject_list_id: SubjectListId,
    /// Number of work items created for this job. Fixed at creation.
    pub total: u32,
    /// Count of work items in `done`, always recomputed from item state.
    pub completed: u32,
    pub status: JobStatus,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Job {
    /// Creates a queued job.
    #[must_use]
    pub fn new(style_id: StyleId, subject_list_id: SubjectListId, total: u32) -> Self {
        let now = Utc::now();
        Self {
            id: JobId::new(),
            style_id,
            subject_list_id,
            total,
            completed: 0,
            status: JobStatus::Queued,
            error: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self.status, JobStatus::Cancelled)
    }

    /// Moves the job to `next`, recording `error` when given.
    pub fn set_status(&mut self, next: JobStatus, error: Option<String>) -> BatchResult<()> {
        self.status = self.status.transition_to(next)?;
        if error.is_some() {
            self.error = error;
        }
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Applies recomputed counts.
    ///
    /// Counts are always written. The status change is attempted separately
    /// and its rejection is returned so callers can log it.
    pub fn apply_progress(&mut self, completed: u32, total: u32) -> BatchResult<()> {
        self.completed = completed;
        self.total = total;
        self.updated_at = Utc::now();
        self.status = self
            .status
            .transition_to(JobStatus::from_progress(completed, total))?;
        Ok(())
    }

    /// Snapshot of the progress fields.
    #[must_use]
    pub const fn progress(&self) -> JobProgress {
        JobProgress {
            completed: self.completed,
            total: self.total,
            status: self.status,
        }
    }
}

/// Result of a progress recompute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobProgress {
    pub completed: u32,
    pub total: u32,
    pub status: JobStatus,
}
