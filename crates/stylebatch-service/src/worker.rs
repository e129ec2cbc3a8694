//! Worker loop: lease messages, generate artifacts, record outcomes.

use crate::dto::{DrainReport, DrainRequest, QueueStatsResponse};
use crate::metrics::ServiceMetrics;
use crate::progress::ProgressAggregator;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::{Duration, Instant};
use stylebatch_clients::{ArtifactStore, GenerationService};
use stylebatch_config::QueueConfig;
use stylebatch_core::{
    artifact_path, BatchError, BatchResult, GenerationRequest, Interface, JobId, JobStatus,
    ValidateExt, WorkItem, WorkItemChange, WorkItemStatus,
};
use stylebatch_queue::{DurableQueue, QueueMessage};
use stylebatch_repository::{CatalogRepository, JobRepository, WorkItemRepository};
use tracing::{debug, error, info, info_span, warn, Instrument};

/// Runs the worker loop over the queue.
#[async_trait]
pub trait QueueDrainer: Interface + Send + Sync {
    /// Leases one batch and processes every message in it.
    ///
    /// Fails only when the queue cannot be read; per-message failures are
    /// counted in the report.
    async fn drain(&self, request: DrainRequest) -> BatchResult<DrainReport>;

    /// Current queue counts.
    async fn stats(&self) -> BatchResult<QueueStatsResponse>;
}

/// Effective parameters of one drain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrainSettings {
    pub batch_size: u32,
    pub visibility_timeout: Duration,
    pub max_attempts: u32,
}

impl DrainSettings {
    /// Settings from configuration alone.
    #[must_use]
    pub fn from_config(config: &QueueConfig) -> Self {
        Self {
            batch_size: config.batch_size,
            visibility_timeout: config.visibility_timeout(),
            max_attempts: config.max_attempts,
        }
    }

    /// Request fields over these defaults.
    #[must_use]
    pub fn with_overrides(self, request: &DrainRequest) -> Self {
        Self {
            batch_size: request.batch_size.unwrap_or(self.batch_size),
            visibility_timeout: request
                .visibility_timeout_secs
                .map_or(self.visibility_timeout, Duration::from_secs),
            max_attempts: request.max_attempts.unwrap_or(self.max_attempts),
        }
    }
}

/// How one leased message ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    /// Artifact generated, uploaded and recorded.
    Completed,
    /// Redelivery of an item that is already done.
    AlreadyDone,
    /// Body failed the payload schema or disagreed with the store.
    Poison,
    /// The referenced work item does not exist.
    MissingItem,
    /// The item is not queued: running elsewhere, failed or cancelled.
    Obsolete,
    /// Another delivery claimed the item first.
    ClaimLost,
    /// Lease budget used up; the item is now `error`.
    Exhausted,
    /// The parent job was cancelled after the claim.
    JobCancelled,
    /// Failure after the claim; item released for redelivery.
    Retry,
    /// Store unavailable before the claim; message left for redelivery.
    Unavailable,
}

impl Outcome {
    const fn succeeded(self) -> bool {
        matches!(self, Self::Completed | Self::AlreadyDone)
    }

    const fn reason(self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::AlreadyDone => "already_done",
            Self::Poison => "poison",
            Self::MissingItem => "missing_item",
            Self::Obsolete => "obsolete",
            Self::ClaimLost => "claim_lost",
            Self::Exhausted => "exhausted",
            Self::JobCancelled => "job_cancelled",
            Self::Retry => "retry",
            Self::Unavailable => "unavailable",
        }
    }
}

/// What happened after a successful claim.
enum Claimed {
    Completed,
    JobCancelled,
    /// The item left `running` before the result could be recorded.
    Superseded,
}

/// Stateless worker over the durable queue.
///
/// Holds no state between drains; all coordination goes through the job
/// store (conditional writes) and the queue (leases).
pub struct QueueWorker {
    queue: Arc<dyn DurableQueue>,
    jobs: Arc<dyn JobRepository>,
    work_items: Arc<dyn WorkItemRepository>,
    catalog: Arc<dyn CatalogRepository>,
    generator: Arc<dyn GenerationService>,
    artifacts: Arc<dyn ArtifactStore>,
    progress: ProgressAggregator,
    defaults: DrainSettings,
}

impl QueueWorker {
    /// Creates a worker.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        queue: Arc<dyn DurableQueue>,
        jobs: Arc<dyn JobRepository>,
        work_items: Arc<dyn WorkItemRepository>,
        catalog: Arc<dyn CatalogRepository>,
        generator: Arc<dyn GenerationService>,
        artifacts: Arc<dyn ArtifactStore>,
        defaults: DrainSettings,
    ) -> Self {
        let progress = ProgressAggregator::new(Arc::clone(&jobs), Arc::clone(&work_items));
        Self {
            queue,
            jobs,
            work_items,
            catalog,
            generator,
            artifacts,
            progress,
            defaults,
        }
    }

    /// Acknowledges a message. A failed delete only means redelivery,
    /// which the idempotency gate absorbs.
    async fn acknowledge(&self, message: &QueueMessage) {
        if let Err(e) = self.queue.delete(message.message_id).await {
            error!(message_id = %message.message_id, error = %e, "Failed to delete message");
        }
    }

    async fn recompute(&self, job_id: JobId) {
        if let Err(e) = self.progress.recompute(job_id).await {
            error!(job_id = %job_id, error = %e, "Failed to recompute job progress");
        }
    }

    async fn process(&self, message: &QueueMessage, settings: DrainSettings) -> Outcome {
        let payload = match message.payload() {
            Ok(payload) => payload,
            Err(e) => {
                warn!(error = %e, "Deleting poison message");
                self.acknowledge(message).await;
                return Outcome::Poison;
            }
        };

        let item = match self.work_items.find_by_id(payload.work_item_id()).await {
            Ok(Some(item)) => item,
            Ok(None) => {
                warn!(work_item_id = %payload.work_item_id(), "Work item not found; dropping message");
                self.acknowledge(message).await;
                return Outcome::MissingItem;
            }
            Err(e) => {
                error!(work_item_id = %payload.work_item_id(), error = %e, "Failed to load work item");
                return Outcome::Unavailable;
            }
        };

        if item.job_id != payload.job_id() {
            warn!(
                work_item_id = %item.id,
                payload_job_id = %payload.job_id(),
                job_id = %item.job_id,
                "Payload job does not own work item; deleting poison message"
            );
            self.acknowledge(message).await;
            return Outcome::Poison;
        }

        // Idempotency gate
        if item.is_completed() {
            debug!(work_item_id = %item.id, "Work item already done; dropping duplicate");
            self.acknowledge(message).await;
            return Outcome::AlreadyDone;
        }
        if item.status != WorkItemStatus::Queued {
            debug!(work_item_id = %item.id, status = %item.status, "Work item not queued; dropping delivery");
            self.acknowledge(message).await;
            return Outcome::Obsolete;
        }

        if item.attempts >= settings.max_attempts {
            return self.exhaust(message, &item, settings.max_attempts).await;
        }

        match self
            .work_items
            .compare_and_set(item.id, WorkItemStatus::Queued, WorkItemChange::Claim)
            .await
        {
            Ok(true) => {}
            Ok(false) => {
                debug!(work_item_id = %item.id, "Claim lost to another delivery");
                self.acknowledge(message).await;
                return Outcome::ClaimLost;
            }
            Err(e) => {
                error!(work_item_id = %item.id, error = %e, "Failed to claim work item");
                return Outcome::Unavailable;
            }
        }

        let attempt = item.attempts + 1;
        debug!(work_item_id = %item.id, attempt, "Claimed work item");

        match self.run_claimed(&item).await {
            Ok(Claimed::Completed) => {
                self.recompute(item.job_id).await;
                self.acknowledge(message).await;
                info!(work_item_id = %item.id, job_id = %item.job_id, attempt, "Work item done");
                Outcome::Completed
            }
            Ok(Claimed::JobCancelled) => {
                info!(work_item_id = %item.id, job_id = %item.job_id, "Job cancelled; skipping generation");
                self.acknowledge(message).await;
                Outcome::JobCancelled
            }
            Ok(Claimed::Superseded) => {
                warn!(work_item_id = %item.id, "Work item changed while running; result discarded");
                self.acknowledge(message).await;
                Outcome::Obsolete
            }
            Err(e) => {
                self.release(&item, attempt, &e).await;
                Outcome::Retry
            }
        }
    }

    /// Fails an item whose lease budget is spent and drops its message.
    async fn exhaust(&self, message: &QueueMessage, item: &WorkItem, max_attempts: u32) -> Outcome {
        let error = format!(
            "max attempts exhausted ({} of {max_attempts})",
            item.attempts
        );
        match self
            .work_items
            .compare_and_set(
                item.id,
                WorkItemStatus::Queued,
                WorkItemChange::Fail {
                    error: error.clone(),
                },
            )
            .await
        {
            Ok(changed) => {
                if changed {
                    warn!(work_item_id = %item.id, attempts = item.attempts, "Work item failed: {}", error);
                    self.recompute(item.job_id).await;
                }
                self.acknowledge(message).await;
                Outcome::Exhausted
            }
            Err(e) => {
                error!(work_item_id = %item.id, error = %e, "Failed to mark work item exhausted");
                Outcome::Unavailable
            }
        }
    }

    /// Everything between the claim and the completion write.
    async fn run_claimed(&self, item: &WorkItem) -> BatchResult<Claimed> {
        self.jobs
            .update_status(item.job_id, JobStatus::Running, None)
            .await?;

        let job = self.jobs.find_by_id(item.job_id).await?;
        let Some(job) = job.filter(|job| !job.is_cancelled()) else {
            // Cleanup may already have run past this row.
            if let Err(e) = self
                .work_items
                .compare_and_set(item.id, WorkItemStatus::Running, WorkItemChange::Cancel)
                .await
            {
                warn!(work_item_id = %item.id, error = %e, "Failed to mark work item cancelled");
            }
            return Ok(Claimed::JobCancelled);
        };

        let style = self
            .catalog
            .find_style(job.style_id)
            .await?
            .ok_or_else(|| BatchError::not_found("Style", job.style_id))?;

        let request = GenerationRequest {
            job_id: job.id,
            work_item_id: item.id,
            subject: item.subject.clone(),
            prompt: style.render_prompt(&item.subject),
            negative_prompt: style.negative_prompt.clone(),
            parameters: style.parameters.clone(),
        };

        let started = Instant::now();
        let generated = self.generator.generate(&request).await;
        ServiceMetrics::generation(started.elapsed(), generated.is_ok());
        let image = generated?;

        let path = artifact_path(job.id, item.id, image.extension());
        let content_type = image.content_type.clone();
        let url = self.artifacts.upload(&path, image.bytes, &content_type).await?;

        let recorded = self
            .work_items
            .compare_and_set(
                item.id,
                WorkItemStatus::Running,
                WorkItemChange::Complete {
                    artifact_path: path.clone(),
                    artifact_url: url,
                },
            )
            .await?;

        if recorded {
            return Ok(Claimed::Completed);
        }

        // Cancel cleanup may have swept the prefix before this upload landed.
        if let Err(e) = self.artifacts.delete(std::slice::from_ref(&path)).await {
            error!(work_item_id = %item.id, path = %path, error = %e, "Failed to delete discarded artifact");
        }
        Ok(Claimed::Superseded)
    }

    /// Puts a claimed item back to `queued` with the failure recorded. The
    /// message is kept so its lease expiry triggers the retry.
    async fn release(&self, item: &WorkItem, attempt: u32, cause: &BatchError) {
        warn!(
            work_item_id = %item.id,
            attempt,
            transient = cause.is_transient(),
            error = %cause,
            "Work item attempt failed; awaiting redelivery"
        );

        match self
            .work_items
            .compare_and_set(
                item.id,
                WorkItemStatus::Running,
                WorkItemChange::Release {
                    error: cause.to_string(),
                },
            )
            .await
        {
            Ok(true) => {}
            Ok(false) => debug!(work_item_id = %item.id, "Work item left running state before release"),
            Err(e) => error!(work_item_id = %item.id, error = %e, "Failed to release work item"),
        }

        self.recompute(item.job_id).await;
    }
}

#[async_trait]
impl QueueDrainer for QueueWorker {
    async fn drain(&self, request: DrainRequest) -> BatchResult<DrainReport> {
        request.validate_request()?;
        let settings = self.defaults.with_overrides(&request);

        let span = info_span!(
            "drain",
            queue = %self.queue.name(),
            batch_size = settings.batch_size,
            max_attempts = settings.max_attempts
        );

        async move {
            let started = Instant::now();
            let messages = self
                .queue
                .read(settings.batch_size, settings.visibility_timeout)
                .await
                .map_err(|e| BatchError::dependency("queue", e.to_string()))?;

            let mut report = DrainReport {
                leased: u32::try_from(messages.len()).unwrap_or(u32::MAX),
                ..DrainReport::default()
            };

            for message in &messages {
                let span = info_span!(
                    "message",
                    message_id = %message.message_id,
                    delivery_count = message.delivery_count
                );
                let outcome = self.process(message, settings).instrument(span).await;

                if outcome.succeeded() {
                    report.succeeded += 1;
                    ServiceMetrics::message_processed("succeeded", outcome.reason());
                } else {
                    report.failed += 1;
                    ServiceMetrics::message_processed("failed", outcome.reason());
                }
            }

            ServiceMetrics::drain(started.elapsed());
            if report.leased > 0 {
                info!(
                    leased = report.leased,
                    succeeded = report.succeeded,
                    failed = report.failed,
                    "Drain finished"
                );
            }
            Ok(report)
        }
        .instrument(span)
        .await
    }

    async fn stats(&self) -> BatchResult<QueueStatsResponse> {
        let stats = self
            .queue
            .stats()
            .await
            .map_err(|e| BatchError::dependency("queue", e.to_string()))?;

        Ok(QueueStatsResponse {
            queue: self.queue.name().to_string(),
            total: stats.total,
            visible: stats.visible,
            leased: stats.leased,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn defaults() -> DrainSettings {
        DrainSettings {
            batch_size: 5,
            visibility_timeout: Duration::from_secs(120),
            max_attempts: 3,
        }
    }

    #[test]
    fn test_overrides_replace_only_given_fields() {
        let settings = defaults().with_overrides(&DrainRequest {
            batch_size: Some(2),
            visibility_timeout_secs: None,
            max_attempts: Some(1),
        });
        assert_eq!(settings.batch_size, 2);
        assert_eq!(settings.visibility_timeout, Duration::from_secs(120));
        assert_eq!(settings.max_attempts, 1);
    }

    #[test]
    fn test_settings_from_config() {
        let config = QueueConfig::default();
        let settings = DrainSettings::from_config(&config);
        assert_eq!(settings.batch_size, config.batch_size);
        assert_eq!(settings.max_attempts, config.max_attempts);
    }

    #[test]
    fn test_outcome_classification() {
        assert!(Outcome::Completed.succeeded());
        assert!(Outcome::AlreadyDone.succeeded());
        for outcome in [
            Outcome::Poison,
            Outcome::MissingItem,
            Outcome::Obsolete,
            Outcome::ClaimLost,
            Outcome::Exhausted,
            Outcome::JobCancelled,
            Outcome::Retry,
            Outcome::Unavailable,
        ] {
            assert!(!outcome.succeeded(), "{} should count as failed", outcome.reason());
        }
    }
}
