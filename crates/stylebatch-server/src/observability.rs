//! Prometheus exporter wiring.

use axum::{routing::get, Router};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use stylebatch_core::{BatchError, BatchResult};
use tracing::info;

/// Installs the global Prometheus recorder and describes every metric.
pub fn install_recorder() -> BatchResult<PrometheusHandle> {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| BatchError::Configuration(format!("Failed to install metrics recorder: {e}")))?;

    stylebatch_queue::metrics::register_metrics();
    stylebatch_service::metrics::register_metrics();

    info!("Prometheus recorder installed");
    Ok(handle)
}

/// Router serving the scrape endpoint at `path`.
pub fn metrics_router(handle: PrometheusHandle, path: &str) -> Router {
    Router::new().route(path, get(move || std::future::ready(handle.render())))
}
