//! Job and work item status state machines.
//!
//! Both enums share the same five states but differ in which edges are
//! legal. Stores enforce the tables below with conditional updates built
//! from [`WorkItemStatus::sources_of`] and [`JobStatus::sources_of`].

use crate::{BatchError, BatchResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lifecycle of a single work item.
///
/// ```text
/// queued -> running -> done
///   |         |  \
///   |         |   -> queued (recoverable failure)
///   +---------+-> error | cancelled
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "snake_case")]
pub enum WorkItemStatus {
    /// Waiting for a worker to lease it.
    #[default]
    Queued,
    /// Claimed by a worker.
    Running,
    /// Artifact generated and uploaded.
    Done,
    /// Attempts exhausted or unrecoverable failure.
    Error,
    /// Parent job was cancelled.
    Cancelled,
}

impl WorkItemStatus {
    /// Storage representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Running => "running",
            Self::Done => "done",
            Self::Error => "error",
            Self::Cancelled => "cancelled",
        }
    }

    /// Terminal states accept no further transitions.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Error | Self::Cancelled)
    }

    /// Checks whether `self -> next` is a legal edge.
    #[must_use]
    pub const fn can_transition_to(&self, next: Self) -> bool {
        match self {
            Self::Queued => matches!(next, Self::Running | Self::Error | Self::Cancelled),
            Self::Running => matches!(
                next,
                Self::Queued | Self::Done | Self::Error | Self::Cancelled
            ),
            Self::Done | Self::Error | Self::Cancelled => false,
        }
    }

    /// Returns `next` if the edge is legal.
    pub fn transition_to(self, next: Self) -> BatchResult<Self> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(BatchError::invalid_transition("work item", self, next))
        }
    }

    /// All states from which `next` may be entered.
    #[must_use]
    pub fn sources_of(next: Self) -> Vec<Self> {
        Self::all()
            .into_iter()
            .filter(|s| s.can_transition_to(next))
            .collect()
    }

    /// All possible statuses.
    #[must_use]
    pub const fn all() -> [Self; 5] {
        [
            Self::Queued,
            Self::Running,
            Self::Done,
            Self::Error,
            Self::Cancelled,
        ]
    }
}

impl fmt::Display for WorkItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WorkItemStatus {
    type Err = BatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::all()
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| BatchError::internal(format!("Unknown work item status: {}", s)))
    }
}

/// Lifecycle of a job as a whole.
///
/// Writing the current status again is always accepted so that redundant
/// progress recomputes stay harmless.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Created, no item leased yet.
    #[default]
    Queued,
    /// At least one item leased or pending completion.
    Running,
    /// Every work item is done.
    Done,
    /// Creation or enqueueing failed.
    Error,
    /// Cancelled by the user; rows are being removed.
    Cancelled,
}

impl JobStatus {
    /// Storage representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Running => "running",
            Self::Done => "done",
            Self::Error => "error",
            Self::Cancelled => "cancelled",
        }
    }

    /// Checks whether `self -> next` is a legal edge (or a no-op write).
    #[must_use]
    pub const fn can_transition_to(&self, next: Self) -> bool {
        if (*self as u8) == (next as u8) {
            return true;
        }
        match self {
            Self::Queued => true,
            Self::Running => matches!(next, Self::Done | Self::Error | Self::Cancelled),
            Self::Error => matches!(next, Self::Running | Self::Done | Self::Cancelled),
            Self::Done => matches!(next, Self::Cancelled),
            Self::Cancelled => false,
        }
    }

    /// Returns `next` if the edge is legal.
    pub fn transition_to(self, next: Self) -> BatchResult<Self> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(BatchError::invalid_transition("job", self, next))
        }
    }

    /// All states from which `next` may be written.
    #[must_use]
    pub fn sources_of(next: Self) -> Vec<Self> {
        Self::all()
            .into_iter()
            .filter(|s| s.can_transition_to(next))
            .collect()
    }

    /// Status implied by the current item counts.
    #[must_use]
    pub const fn from_progress(completed: u32, total: u32) -> Self {
        if total > 0 && completed >= total {
            Self::Done
        } else {
            Self::Running
        }
    }

    /// All possible statuses.
    #[must_use]
    pub const fn all() -> [Self; 5] {
        [
            Self::Queued,
            Self::Running,
            Self::Done,
            Self::Error,
            Self::Cancelled,
        ]
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = BatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::all()
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| BatchError::internal(format!("Unknown job status: {}", s)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_work_item_happy_path() {
        let status = WorkItemStatus::Queued;
        let status = status.transition_to(WorkItemStatus::Running).unwrap();
        let status = status.transition_to(WorkItemStatus::Done).unwrap();
        assert!(status.is_terminal());
    }

    #[test]
    fn test_work_item_retry_edge() {
        assert!(WorkItemStatus::Running.can_transition_to(WorkItemStatus::Queued));
        assert!(!WorkItemStatus::Queued.can_transition_to(WorkItemStatus::Queued));
    }

    #[test]
    fn test_work_item_rejects_illegal_edges() {
        let err = WorkItemStatus::Done
            .transition_to(WorkItemStatus::Running)
            .unwrap_err();
        assert!(matches!(err, BatchError::InvalidTransition { .. }));
        assert!(!WorkItemStatus::Queued.can_transition_to(WorkItemStatus::Done));
        assert!(!WorkItemStatus::Running.can_transition_to(WorkItemStatus::Running));
        assert!(!WorkItemStatus::Cancelled.can_transition_to(WorkItemStatus::Queued));
    }

    #[test]
    fn test_work_item_sources() {
        assert_eq!(
            WorkItemStatus::sources_of(WorkItemStatus::Running),
            vec![WorkItemStatus::Queued]
        );
        assert_eq!(
            WorkItemStatus::sources_of(WorkItemStatus::Done),
            vec![WorkItemStatus::Running]
        );
        assert_eq!(
            WorkItemStatus::sources_of(WorkItemStatus::Error),
            vec![WorkItemStatus::Queued, WorkItemStatus::Running]
        );
    }

    #[test]
    fn test_job_same_status_is_noop() {
        for status in JobStatus::all() {
            assert!(status.can_transition_to(status));
        }
    }

    #[test]
    fn test_job_cancelled_is_final() {
        for next in [JobStatus::Queued, JobStatus::Running, JobStatus::Done, JobStatus::Error] {
            assert!(JobStatus::Cancelled.transition_to(next).is_err());
        }
    }

    #[test]
    fn test_job_done_only_cancels() {
        assert!(!JobStatus::Done.can_transition_to(JobStatus::Running));
        assert!(!JobStatus::Done.can_transition_to(JobStatus::Error));
        assert!(JobStatus::Done.can_transition_to(JobStatus::Cancelled));
    }

    #[test]
    fn test_job_error_recovers() {
        assert!(JobStatus::Error.can_transition_to(JobStatus::Running));
        assert!(JobStatus::Error.can_transition_to(JobStatus::Done));
        assert!(!JobStatus::Running.can_transition_to(JobStatus::Queued));
    }

    #[test]
    fn test_job_sources_of_running() {
        assert_eq!(
            JobStatus::sources_of(JobStatus::Running),
            vec![JobStatus::Queued, JobStatus::Running, JobStatus::Error]
        );
        assert_eq!(JobStatus::sources_of(JobStatus::Cancelled).len(), 5);
    }

    #[test]
    fn test_from_progress() {
        assert_eq!(JobStatus::from_progress(0, 0), JobStatus::Running);
        assert_eq!(JobStatus::from_progress(1, 2), JobStatus::Running);
        assert_eq!(JobStatus::from_progress(2, 2), JobStatus::Done);
    }

    #[test]
    fn test_status_parse_and_serde() {
        assert_eq!("running".parse::<JobStatus>().unwrap(), JobStatus::Running);
        assert!("paused".parse::<WorkItemStatus>().is_err());
        assert_eq!(
            serde_json::to_string(&WorkItemStatus::Cancelled).unwrap(),
            "\"cancelled\""
        );
        assert_eq!(JobStatus::Error.to_string(), "error");
    }
}
