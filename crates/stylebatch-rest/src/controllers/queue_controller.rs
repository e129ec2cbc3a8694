//! Queue controller: on-demand drains and queue counts.

use crate::{
    extractors::ValidatedJson,
    responses::{ok, ApiResult},
    state::AppState,
};
use axum::{
    extract::State,
    routing::{get, post},
    Router,
};
use stylebatch_service::{DrainReport, DrainRequest, QueueStatsResponse};
use tracing::debug;

/// Creates the queue router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/drain", post(drain_queue))
        .route("/stats", get(queue_stats))
}

/// Run one drain: lease a batch and process it.
///
/// Send `{}` to use the configured defaults.
#[utoipa::path(
    post,
    path = "/queue/drain",
    tag = "queue",
    request_body = DrainRequest,
    responses(
        (status = 200, description = "Drain finished", body = DrainReport),
        (status = 422, description = "Parameter out of range"),
        (status = 503, description = "Queue unavailable")
    )
)]
pub async fn drain_queue(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<DrainRequest>,
) -> ApiResult<DrainReport> {
    debug!(?request, "Drain request");

    let report = state.drainer.drain(request).await?;
    ok(report)
}

/// Current message counts.
#[utoipa::path(
    get,
    path = "/queue/stats",
    tag = "queue",
    responses(
        (status = 200, description = "Queue counts", body = QueueStatsResponse),
        (status = 503, description = "Queue unavailable")
    )
)]
pub async fn queue_stats(State(state): State<AppState>) -> ApiResult<QueueStatsResponse> {
    let stats = state.drainer.stats().await?;
    ok(stats)
}
