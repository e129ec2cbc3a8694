//! Metrics for job processing.

use metrics::{counter, describe_counter, describe_histogram, histogram};
use std::time::Duration;

/// Metric names for job processing.
pub mod names {
    /// Jobs created.
    pub const JOBS_CREATED_TOTAL: &str = "stylebatch_jobs_created_total";
    /// Jobs whose creation failed while enqueueing.
    pub const JOBS_ENQUEUE_FAILED_TOTAL: &str = "stylebatch_jobs_enqueue_failed_total";
    /// Jobs resumed.
    pub const JOBS_RESUMED_TOTAL: &str = "stylebatch_jobs_resumed_total";
    /// Jobs cancelled.
    pub const JOBS_CANCELLED_TOTAL: &str = "stylebatch_jobs_cancelled_total";
    /// Artifacts removed by cancellation.
    pub const ARTIFACTS_DELETED_TOTAL: &str = "stylebatch_artifacts_deleted_total";

    /// Leased messages by outcome and reason.
    pub const MESSAGES_PROCESSED_TOTAL: &str = "stylebatch_messages_processed_total";

    /// Generation call duration in seconds.
    pub const GENERATION_DURATION_SECONDS: &str = "stylebatch_generation_duration_seconds";
    /// Duration of one drain in seconds.
    pub const DRAIN_DURATION_SECONDS: &str = "stylebatch_drain_duration_seconds";
}

/// Register all metric descriptions.
pub fn register_metrics() {
    describe_counter!(names::JOBS_CREATED_TOTAL, "Total number of jobs created");
    describe_counter!(
        names::JOBS_ENQUEUE_FAILED_TOTAL,
        "Total number of jobs left in error because enqueueing failed"
    );
    describe_counter!(names::JOBS_RESUMED_TOTAL, "Total number of job resumes");
    describe_counter!(names::JOBS_CANCELLED_TOTAL, "Total number of job cancellations");
    describe_counter!(
        names::ARTIFACTS_DELETED_TOTAL,
        "Total number of artifacts deleted by cancellation"
    );
    describe_counter!(
        names::MESSAGES_PROCESSED_TOTAL,
        "Leased messages by outcome (succeeded, failed) and reason"
    );
    describe_histogram!(
        names::GENERATION_DURATION_SECONDS,
        "Generation service call duration in seconds"
    );
    describe_histogram!(names::DRAIN_DURATION_SECONDS, "Drain duration in seconds");
}

/// Service metrics recorder.
#[derive(Clone)]
pub struct ServiceMetrics;

impl ServiceMetrics {
    pub fn job_created() {
        counter!(names::JOBS_CREATED_TOTAL).increment(1);
    }

    pub fn job_enqueue_failed() {
        counter!(names::JOBS_ENQUEUE_FAILED_TOTAL).increment(1);
    }

    pub fn job_resumed() {
        counter!(names::JOBS_RESUMED_TOTAL).increment(1);
    }

    pub fn job_cancelled(deleted_artifacts: u64) {
        counter!(names::JOBS_CANCELLED_TOTAL).increment(1);
        counter!(names::ARTIFACTS_DELETED_TOTAL).increment(deleted_artifacts);
    }

    /// Record the outcome of one leased message.
    pub fn message_processed(outcome: &'static str, reason: &'static str) {
        counter!(
            names::MESSAGES_PROCESSED_TOTAL,
            "outcome" => outcome,
            "reason" => reason
        )
        .increment(1);
    }

    pub fn generation(duration: Duration, success: bool) {
        histogram!(
            names::GENERATION_DURATION_SECONDS,
            "success" => if success { "true" } else { "false" }
        )
        .record(duration.as_secs_f64());
    }

    pub fn drain(duration: Duration) {
        histogram!(names::DRAIN_DURATION_SECONDS).record(duration.as_secs_f64());
    }
}
