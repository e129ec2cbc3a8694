//! Job service implementation.

use crate::dto::{
    CancelJobResponse, CreateJobRequest, CreateJobResponse, JobStatusResponse, ResumeJobResponse,
};
use crate::job_service::JobService;
use crate::metrics::ServiceMetrics;
use async_trait::async_trait;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use stylebatch_clients::{ArtifactStore, MAX_DELETE_BATCH};
use stylebatch_core::{
    job_artifact_prefix, BatchError, BatchResult, Job, JobId, JobStatus, StyleId, SubjectListId,
    ValidateExt, WorkItem, WorkItemStatus,
};
use stylebatch_queue::{DurableQueue, TaskPayload};
use stylebatch_repository::{CatalogRepository, JobRepository, WorkItemRepository};
use tracing::{debug, error, info, warn};

/// Job service implementation.
pub struct JobServiceImpl {
    jobs: Arc<dyn JobRepository>,
    work_items: Arc<dyn WorkItemRepository>,
    catalog: Arc<dyn CatalogRepository>,
    queue: Arc<dyn DurableQueue>,
    artifacts: Arc<dyn ArtifactStore>,
}

impl JobServiceImpl {
    /// Creates a new job service.
    pub fn new(
        jobs: Arc<dyn JobRepository>,
        work_items: Arc<dyn WorkItemRepository>,
        catalog: Arc<dyn CatalogRepository>,
        queue: Arc<dyn DurableQueue>,
        artifacts: Arc<dyn ArtifactStore>,
    ) -> Self {
        Self {
            jobs,
            work_items,
            catalog,
            queue,
            artifacts,
        }
    }

    /// Sends one message per item, stopping at the first failure.
    ///
    /// Returns how many were sent and the error that stopped the loop.
    async fn enqueue_all(&self, job_id: JobId, items: &[WorkItem]) -> (u32, Option<String>) {
        let mut sent = 0u32;
        for item in items {
            let payload = TaskPayload::generate(job_id, item.id);
            match self.queue.send(&payload, Duration::ZERO).await {
                Ok(message_id) => {
                    debug!(
                        job_id = %job_id,
                        work_item_id = %item.id,
                        message_id = %message_id,
                        "Enqueued work item"
                    );
                    sent += 1;
                }
                Err(e) => return (sent, Some(e.to_string())),
            }
        }
        (sent, None)
    }

    /// Recorded artifact paths plus whatever the store holds under the
    /// job's prefix, de-duplicated.
    async fn artifact_paths(&self, job_id: JobId, items: &[WorkItem]) -> BatchResult<Vec<String>> {
        let mut paths: BTreeSet<String> = items
            .iter()
            .filter_map(|item| item.artifact_path.clone())
            .collect();

        let listed = self.artifacts.list(&job_artifact_prefix(job_id)).await?;
        let orphans = listed
            .into_iter()
            .filter(|object| paths.insert(object.path.clone()))
            .count();
        if orphans > 0 {
            info!(job_id = %job_id, orphans, "Found artifacts not recorded on any work item");
        }

        Ok(paths.into_iter().collect())
    }
}

#[async_trait]
impl JobService for JobServiceImpl {
    async fn create_job(&self, request: CreateJobRequest) -> BatchResult<CreateJobResponse> {
        debug!(style_id = %request.style_id, subject_list_id = %request.subject_list_id, "Creating job");

        request.validate_request()?;
        let style_id = StyleId::parse(request.style_id.trim())
            .map_err(|_| BatchError::validation("style_id must be a UUID"))?;
        let subject_list_id = SubjectListId::parse(request.subject_list_id.trim())
            .map_err(|_| BatchError::validation("subject_list_id must be a UUID"))?;

        let subject_list = self
            .catalog
            .find_subject_list(subject_list_id)
            .await?
            .ok_or_else(|| BatchError::not_found("SubjectList", subject_list_id))?;
        let subjects = subject_list.normalized_subjects();
        if subjects.is_empty() {
            return Err(BatchError::validation(format!(
                "subject list {subject_list_id} has no non-empty subjects"
            )));
        }

        if self.catalog.find_style(style_id).await?.is_none() {
            return Err(BatchError::not_found("Style", style_id));
        }

        let total = u32::try_from(subjects.len())
            .map_err(|_| BatchError::validation("subject list is too large"))?;
        let job = Job::new(style_id, subject_list_id, total);
        let items: Vec<WorkItem> = subjects
            .into_iter()
            .map(|subject| WorkItem::new(job.id, subject))
            .collect();

        self.jobs.create_with_items(&job, &items).await?;

        let (sent, failure) = self.enqueue_all(job.id, &items).await;
        if let Some(cause) = failure {
            let detail = format!("enqueue failed after {sent} of {total} messages: {cause}");
            error!(job_id = %job.id, sent, total, error = %cause, "Job enqueue failed");
            ServiceMetrics::job_enqueue_failed();

            if let Err(e) = self
                .jobs
                .update_status(job.id, JobStatus::Error, Some(&detail))
                .await
            {
                error!(job_id = %job.id, error = %e, "Failed to record enqueue failure on job");
            }
            return Err(BatchError::dependency("queue", detail));
        }

        ServiceMetrics::job_created();
        info!(job_id = %job.id, total, "Job created");

        Ok(CreateJobResponse {
            job_id: job.id,
            total,
        })
    }

    async fn get_job(&self, job_id: JobId) -> BatchResult<JobStatusResponse> {
        debug!(job_id = %job_id, "Getting job");

        let job = self
            .jobs
            .find_by_id(job_id)
            .await?
            .ok_or_else(|| BatchError::not_found("Job", job_id))?;
        let items = self.work_items.find_by_job(job_id).await?;

        Ok(JobStatusResponse::new(job, items))
    }

    async fn resume_job(&self, job_id: JobId) -> BatchResult<ResumeJobResponse> {
        debug!(job_id = %job_id, "Resuming job");

        let job = self
            .jobs
            .find_by_id(job_id)
            .await?
            .ok_or_else(|| BatchError::not_found("Job", job_id))?;
        if job.is_cancelled() {
            info!(job_id = %job_id, "Resume of cancelled job ignored");
            return Ok(ResumeJobResponse {
                job_id,
                enqueued: 0,
            });
        }

        let queued = self
            .work_items
            .find_by_job_and_status(job_id, WorkItemStatus::Queued)
            .await?;
        let (enqueued, failure) = self.enqueue_all(job_id, &queued).await;

        if enqueued > 0 {
            let moved = self
                .jobs
                .update_status(job_id, JobStatus::Running, None)
                .await?;
            if !moved {
                warn!(job_id = %job_id, status = %job.status, "Job not moved to running on resume");
            }
        }

        if let Some(cause) = failure {
            return Err(BatchError::dependency(
                "queue",
                format!(
                    "resume enqueued {enqueued} of {} messages: {cause}",
                    queued.len()
                ),
            ));
        }

        ServiceMetrics::job_resumed();
        info!(job_id = %job_id, enqueued, "Job resumed");

        Ok(ResumeJobResponse { job_id, enqueued })
    }

    async fn cancel_job(&self, job_id: JobId) -> BatchResult<CancelJobResponse> {
        debug!(job_id = %job_id, "Cancelling job");

        // Workers check for this status before calling the generation
        // service, so it must land before anything is removed.
        let marked = self
            .jobs
            .update_status(job_id, JobStatus::Cancelled, None)
            .await?;
        if !marked && self.jobs.find_by_id(job_id).await?.is_none() {
            debug!(job_id = %job_id, "Job already gone");
            return Ok(CancelJobResponse::empty(job_id));
        }

        let items = self.work_items.find_by_job(job_id).await?;
        let paths = self.artifact_paths(job_id, &items).await?;

        let mut deleted_artifacts = 0u64;
        for chunk in paths.chunks(MAX_DELETE_BATCH) {
            deleted_artifacts += self.artifacts.delete(chunk).await?;
        }

        let deleted_work_items = self.work_items.delete_by_job(job_id).await?;
        self.jobs.delete(job_id).await?;

        ServiceMetrics::job_cancelled(deleted_artifacts);
        info!(
            job_id = %job_id,
            deleted_work_items,
            deleted_artifacts,
            "Job cancelled"
        );

        Ok(CancelJobResponse {
            job_id,
            deleted_work_items,
            deleted_artifacts,
        })
    }
}
