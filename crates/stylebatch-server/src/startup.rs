//! Server startup utilities.

use stylebatch_config::AppConfig;
use tracing::info;

/// Logs where everything is served and how the worker is set up.
pub fn print_startup_info(config: &AppConfig) {
    let separator = "=".repeat(60);
    let addr = config.server.addr();
    info!("{}", separator);
    info!("REST API:  http://{}/api/v1", addr);
    info!("Health:    http://{}/health", addr);
    info!("API Docs:  http://{}/swagger-ui", addr);
    if config.observability.metrics_enabled {
        info!("Metrics:   http://{}{}", addr, config.observability.metrics_path);
    }
    info!(
        "Queue:     {} ({:?}, batch {}, lease {}s, {} attempts)",
        config.queue.name,
        config.queue.backend,
        config.queue.batch_size,
        config.queue.visibility_timeout_secs,
        config.queue.max_attempts
    );
    if config.worker.enabled {
        info!(
            "Worker:    '{}' x{}",
            config.worker.schedule, config.worker.invocations
        );
    } else {
        info!("Worker:    disabled (drain via POST /api/v1/queue/drain)");
    }
    info!("{}", separator);
}
