//! Job service trait definition.

use crate::dto::{
    CancelJobResponse, CreateJobRequest, CreateJobResponse, JobStatusResponse, ResumeJobResponse,
};
use async_trait::async_trait;
use stylebatch_core::{BatchResult, Interface, JobId};

/// Job service trait.
#[async_trait]
pub trait JobService: Interface + Send + Sync {
    /// Creates a job with one work item and one queue message per subject.
    async fn create_job(&self, request: CreateJobRequest) -> BatchResult<CreateJobResponse>;

    /// Gets a job with all of its work items.
    async fn get_job(&self, job_id: JobId) -> BatchResult<JobStatusResponse>;

    /// Sends a fresh message for every queued work item of a job.
    async fn resume_job(&self, job_id: JobId) -> BatchResult<ResumeJobResponse>;

    /// Cancels a job and removes its work items and artifacts.
    ///
    /// Idempotent: a job that no longer exists yields zero counts.
    async fn cancel_job(&self, job_id: JobId) -> BatchResult<CancelJobResponse>;
}
