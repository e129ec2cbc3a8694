//! OpenAPI documentation configuration.

use crate::controllers::health_controller::{ComponentHealth, HealthResponse, ReadinessResponse};
use stylebatch_core::{ErrorResponse, FieldError, JobStatus, WorkItemStatus};
use stylebatch_service::{
    CancelJobResponse, CreateJobRequest, CreateJobResponse, DrainReport, DrainRequest,
    JobStatusResponse, QueueStatsResponse, ResumeJobResponse, WorkItemResponse,
};
use utoipa::OpenApi;

/// OpenAPI documentation for the Stylebatch API.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Stylebatch API",
        version = "1.0.0",
        description = "Batch image generation: one job per style and subject list, one artifact per subject",
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    ),
    servers(
        (url = "/api/v1", description = "API v1")
    ),
    paths(
        crate::controllers::job_controller::create_job,
        crate::controllers::job_controller::get_job,
        crate::controllers::job_controller::resume_job,
        crate::controllers::job_controller::cancel_job,
        crate::controllers::queue_controller::drain_queue,
        crate::controllers::queue_controller::queue_stats,
        crate::controllers::health_controller::health_check,
        crate::controllers::health_controller::readiness_check,
        crate::controllers::health_controller::liveness_check,
    ),
    components(
        schemas(
            ErrorResponse,
            FieldError,
            JobStatus,
            WorkItemStatus,
            CreateJobRequest,
            CreateJobResponse,
            JobStatusResponse,
            WorkItemResponse,
            ResumeJobResponse,
            CancelJobResponse,
            DrainRequest,
            DrainReport,
            QueueStatsResponse,
            HealthResponse,
            ReadinessResponse,
            ComponentHealth,
        )
    ),
    tags(
        (name = "jobs", description = "Job submission, status, resume and cancellation"),
        (name = "queue", description = "Worker drains and queue counts"),
        (name = "health", description = "Health check endpoints")
    )
)]
pub struct ApiDoc;
