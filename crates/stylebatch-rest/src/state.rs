//! Application state for Axum handlers.

use std::sync::Arc;
use stylebatch_core::HealthCheck;
use stylebatch_service::{JobService, QueueDrainer};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub job_service: Arc<dyn JobService>,
    pub drainer: Arc<dyn QueueDrainer>,
    /// Probes consulted by `/ready`.
    pub health_checks: Arc<Vec<Arc<dyn HealthCheck>>>,
}

impl AppState {
    /// Creates a new application state.
    pub fn new(
        job_service: Arc<dyn JobService>,
        drainer: Arc<dyn QueueDrainer>,
        health_checks: Vec<Arc<dyn HealthCheck>>,
    ) -> Self {
        Self {
            job_service,
            drainer,
            health_checks: Arc::new(health_checks),
        }
    }
}
