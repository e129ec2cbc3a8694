//! Repository trait definitions.

use async_trait::async_trait;
use stylebatch_core::{
    BatchResult, Interface, Job, JobId, JobStatus, Style, StyleId, SubjectList, SubjectListId,
    WorkItem, WorkItemChange, WorkItemId, WorkItemStatus,
};

/// Job repository.
#[async_trait]
pub trait JobRepository: Interface + Send + Sync {
    /// Inserts a job and all of its work items atomically.
    async fn create_with_items(&self, job: &Job, items: &[WorkItem]) -> BatchResult<()>;

    /// Finds a job by ID.
    async fn find_by_id(&self, id: JobId) -> BatchResult<Option<Job>>;

    /// Moves a job to `next` if its current status allows it.
    ///
    /// `error`, when given, replaces the recorded error. Returns `false`
    /// when the job is missing or the transition is not legal from the
    /// row's current status.
    async fn update_status(
        &self,
        id: JobId,
        next: JobStatus,
        error: Option<&str>,
    ) -> BatchResult<bool>;

    /// Writes recomputed counts and the status they imply.
    ///
    /// A cancelled job is left untouched. Otherwise the counts are always
    /// written and the status only when the transition is legal. Returns
    /// the job as stored afterwards, `None` if it does not exist.
    async fn apply_progress(&self, id: JobId, completed: u32, total: u32)
        -> BatchResult<Option<Job>>;

    /// Deletes a job row. Returns whether a row was removed.
    async fn delete(&self, id: JobId) -> BatchResult<bool>;
}

/// Item counts for one job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ItemCounts {
    /// All work items of the job.
    pub total: u32,
    /// Work items in `done`.
    pub done: u32,
}

/// Work item repository.
#[async_trait]
pub trait WorkItemRepository: Interface + Send + Sync {
    /// Finds a work item by ID.
    async fn find_by_id(&self, id: WorkItemId) -> BatchResult<Option<WorkItem>>;

    /// All work items of a job, in creation order.
    async fn find_by_job(&self, job_id: JobId) -> BatchResult<Vec<WorkItem>>;

    /// Work items of a job currently in `status`.
    async fn find_by_job_and_status(
        &self,
        job_id: JobId,
        status: WorkItemStatus,
    ) -> BatchResult<Vec<WorkItem>>;

    /// Counts a job's work items.
    async fn count_by_job(&self, job_id: JobId) -> BatchResult<ItemCounts>;

    /// Applies `change` only if the row is still in `expected`.
    ///
    /// Returns `true` if the row changed, `false` if it was missing or had
    /// moved on. An edge the state machine forbids is rejected with
    /// `InvalidTransition` before touching the store.
    async fn compare_and_set(
        &self,
        id: WorkItemId,
        expected: WorkItemStatus,
        change: WorkItemChange,
    ) -> BatchResult<bool>;

    /// Deletes every work item of a job. Returns the number removed.
    async fn delete_by_job(&self, job_id: JobId) -> BatchResult<u64>;
}

/// Read-only access to styles and subject lists.
#[async_trait]
pub trait CatalogRepository: Interface + Send + Sync {
    /// Finds a style by ID.
    async fn find_style(&self, id: StyleId) -> BatchResult<Option<Style>>;

    /// Finds a subject list by ID.
    async fn find_subject_list(&self, id: SubjectListId) -> BatchResult<Option<SubjectList>>;
}
