//! Job progress aggregation.

use std::sync::Arc;
use stylebatch_core::{BatchResult, JobId, JobProgress, JobStatus};
use stylebatch_repository::{JobRepository, WorkItemRepository};
use tracing::{debug, warn};

/// Recomputes a job's counters from the state of its work items.
///
/// `completed` and `total` are never incremented in place. Each call counts
/// the rows again and writes the result, so redundant or concurrent calls
/// converge on the same values.
#[derive(Clone)]
pub struct ProgressAggregator {
    jobs: Arc<dyn JobRepository>,
    work_items: Arc<dyn WorkItemRepository>,
}

impl ProgressAggregator {
    pub fn new(jobs: Arc<dyn JobRepository>, work_items: Arc<dyn WorkItemRepository>) -> Self {
        Self { jobs, work_items }
    }

    /// Writes `completed = count(done)`, `total = count(all)` and the
    /// status they imply.
    ///
    /// Returns `None` when the job no longer exists. A cancelled job is
    /// returned unchanged.
    pub async fn recompute(&self, job_id: JobId) -> BatchResult<Option<JobProgress>> {
        let counts = self.work_items.count_by_job(job_id).await?;
        debug!(job_id = %job_id, done = counts.done, total = counts.total, "Recomputing job progress");

        let Some(job) = self
            .jobs
            .apply_progress(job_id, counts.done, counts.total)
            .await?
        else {
            debug!(job_id = %job_id, "Job gone before progress could be written");
            return Ok(None);
        };

        let implied = JobStatus::from_progress(counts.done, counts.total);
        if job.status != implied && !job.is_cancelled() {
            warn!(
                job_id = %job_id,
                stored = %job.status,
                implied = %implied,
                "Job status change rejected; counts written"
            );
        }

        Ok(Some(job.progress()))
    }
}
