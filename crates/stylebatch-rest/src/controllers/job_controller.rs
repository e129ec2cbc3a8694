//! Job controller.

use crate::{
    extractors::ValidatedJson,
    responses::{created, ok, ApiResult, AppError},
    state::AppState,
};
use axum::{
    extract::{Path, State},
    response::Response,
    routing::{get, post},
    Router,
};
use stylebatch_core::{BatchError, JobId};
use stylebatch_service::{
    CancelJobResponse, CreateJobRequest, CreateJobResponse, JobStatusResponse, ResumeJobResponse,
};
use tracing::debug;

/// Creates the job router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_job))
        .route("/:job_id", get(get_job).delete(cancel_job))
        .route("/:job_id/resume", post(resume_job))
}

/// Create a job from a style and a subject list.
#[utoipa::path(
    post,
    path = "/jobs",
    tag = "jobs",
    request_body = CreateJobRequest,
    responses(
        (status = 201, description = "Job created and enqueued", body = CreateJobResponse),
        (status = 400, description = "Subject list has no subjects"),
        (status = 404, description = "Style or subject list not found"),
        (status = 422, description = "Invalid request body"),
        (status = 503, description = "Queue unavailable; job recorded as error")
    )
)]
pub async fn create_job(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<CreateJobRequest>,
) -> Result<Response, AppError> {
    debug!(style_id = %request.style_id, subject_list_id = %request.subject_list_id, "Create job request");

    let response = state.job_service.create_job(request).await?;
    let location = format!("/api/v1/jobs/{}", response.job_id);
    Ok(created(&location, response))
}

/// Get a job with its work items.
#[utoipa::path(
    get,
    path = "/jobs/{job_id}",
    tag = "jobs",
    params(("job_id" = String, Path, description = "Job ID")),
    responses(
        (status = 200, description = "Job found", body = JobStatusResponse),
        (status = 404, description = "Job not found")
    )
)]
pub async fn get_job(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<JobStatusResponse> {
    debug!("Get job request: {}", id);

    let job_id = parse_job_id(&id)?;
    let response = state.job_service.get_job(job_id).await?;
    ok(response)
}

/// Re-send messages for every queued work item of a job.
#[utoipa::path(
    post,
    path = "/jobs/{job_id}/resume",
    tag = "jobs",
    params(("job_id" = String, Path, description = "Job ID")),
    responses(
        (status = 200, description = "Messages sent", body = ResumeJobResponse),
        (status = 404, description = "Job not found"),
        (status = 503, description = "Queue unavailable")
    )
)]
pub async fn resume_job(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<ResumeJobResponse> {
    debug!("Resume job request: {}", id);

    let job_id = parse_job_id(&id)?;
    let response = state.job_service.resume_job(job_id).await?;
    ok(response)
}

/// Cancel a job and delete its work items and artifacts.
#[utoipa::path(
    delete,
    path = "/jobs/{job_id}",
    tag = "jobs",
    params(("job_id" = String, Path, description = "Job ID")),
    responses(
        (status = 200, description = "Job cancelled; zero counts if it was already gone", body = CancelJobResponse),
        (status = 503, description = "Store or artifact storage unavailable")
    )
)]
pub async fn cancel_job(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<CancelJobResponse> {
    debug!("Cancel job request: {}", id);

    let job_id = parse_job_id(&id)?;
    let response = state.job_service.cancel_job(job_id).await?;
    ok(response)
}

fn parse_job_id(id: &str) -> Result<JobId, AppError> {
    JobId::parse(id).map_err(|_| AppError(BatchError::Validation(format!("Invalid job ID: {}", id))))
}
