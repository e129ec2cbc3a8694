//! Composition root.
//!
//! Every dependency is constructed here from configuration and handed to
//! its consumers as an `Arc<dyn Trait>`.

use crate::observability::{install_recorder, metrics_router};
use axum::Router;
use std::sync::Arc;
use stylebatch_clients::{build_artifact_store, ArtifactStore, GenerationService, HttpGenerationClient};
use stylebatch_config::AppConfig;
use stylebatch_core::{BatchError, BatchResult, HealthCheck};
use stylebatch_queue::{build_queue, DurableQueue, QueueHealthCheck};
use stylebatch_repository::{
    create_pool, CatalogRepository, DatabaseHealthCheck, DatabasePoolInterface, JobRepository,
    MySqlCatalogRepository, MySqlJobRepository, MySqlWorkItemRepository, WorkItemRepository,
};
use stylebatch_rest::{create_router, AppState};
use stylebatch_service::{
    DrainScheduler, DrainSettings, JobService, JobServiceImpl, QueueDrainer, QueueWorker,
};
use tokio::task::JoinHandle;
use tracing::{error, info};

/// Services built from configuration.
pub struct Components {
    pub pool: Arc<dyn DatabasePoolInterface>,
    pub queue: Arc<dyn DurableQueue>,
    pub job_service: Arc<dyn JobService>,
    pub drainer: Arc<dyn QueueDrainer>,
    pub health_checks: Vec<Arc<dyn HealthCheck>>,
}

impl Components {
    /// Connects to every backend and wires the services.
    pub async fn build(config: &AppConfig) -> BatchResult<Self> {
        let pool: Arc<dyn DatabasePoolInterface> = create_pool(&config.database).await?;
        if config.database.run_migrations {
            pool.run_migrations().await?;
        }

        let queue = build_queue(&config.queue, &config.redis).await?;
        info!(queue = %queue.name(), backend = ?config.queue.backend, "Queue ready");

        let generator: Arc<dyn GenerationService> =
            Arc::new(HttpGenerationClient::new(&config.generation)?);
        let artifacts: Arc<dyn ArtifactStore> = build_artifact_store(&config.storage)?;
        info!(bucket = %artifacts.bucket(), backend = ?config.storage.backend, "Artifact store ready");

        Ok(Self::wire(config, pool, queue, generator, artifacts))
    }

    /// Wires services over already-constructed backends.
    pub fn wire(
        config: &AppConfig,
        pool: Arc<dyn DatabasePoolInterface>,
        queue: Arc<dyn DurableQueue>,
        generator: Arc<dyn GenerationService>,
        artifacts: Arc<dyn ArtifactStore>,
    ) -> Self {
        let jobs: Arc<dyn JobRepository> = Arc::new(MySqlJobRepository::new(pool.clone()));
        let work_items: Arc<dyn WorkItemRepository> =
            Arc::new(MySqlWorkItemRepository::new(pool.clone()));
        let catalog: Arc<dyn CatalogRepository> =
            Arc::new(MySqlCatalogRepository::new(pool.clone()));

        let job_service: Arc<dyn JobService> = Arc::new(JobServiceImpl::new(
            jobs.clone(),
            work_items.clone(),
            catalog.clone(),
            queue.clone(),
            artifacts.clone(),
        ));
        let drainer: Arc<dyn QueueDrainer> = Arc::new(QueueWorker::new(
            queue.clone(),
            jobs,
            work_items,
            catalog,
            generator,
            artifacts,
            DrainSettings::from_config(&config.queue),
        ));

        let health_checks: Vec<Arc<dyn HealthCheck>> = vec![
            Arc::new(DatabaseHealthCheck::new(pool.clone())),
            Arc::new(QueueHealthCheck::new(queue.clone())),
        ];

        Self {
            pool,
            queue,
            job_service,
            drainer,
            health_checks,
        }
    }
}

/// The assembled server.
pub struct Application {
    config: AppConfig,
    components: Components,
    router: Router,
    scheduler: Option<Arc<DrainScheduler>>,
}

impl Application {
    /// Builds components, the router and, when enabled, the drain scheduler.
    pub async fn build(config: AppConfig) -> BatchResult<Self> {
        let components = Components::build(&config).await?;
        Self::from_components(config, components)
    }

    /// Assembles the application around prepared components.
    pub fn from_components(config: AppConfig, components: Components) -> BatchResult<Self> {
        let state = AppState::new(
            components.job_service.clone(),
            components.drainer.clone(),
            components.health_checks.clone(),
        );
        let mut router = create_router(state, &config.server);

        if config.observability.metrics_enabled {
            let handle = install_recorder()?;
            router = router.merge(metrics_router(handle, &config.observability.metrics_path));
        }

        let scheduler = if config.worker.enabled {
            Some(Arc::new(DrainScheduler::new(
                components.drainer.clone(),
                &config.worker,
            )?))
        } else {
            None
        };

        Ok(Self {
            config,
            components,
            router,
            scheduler,
        })
    }

    /// The HTTP router.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Serves until `shutdown` resolves, then stops the scheduler and
    /// closes the database pool.
    pub async fn run<F>(self, shutdown: F) -> BatchResult<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let addr = self.config.server.addr();
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|e| BatchError::Internal(format!("Failed to bind {}: {}", addr, e)))?;
        info!("Starting REST server on http://{}", addr);

        let worker: Option<JoinHandle<()>> = self.scheduler.clone().map(DrainScheduler::spawn);

        let served = axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| BatchError::Internal(format!("REST server error: {}", e)));

        if let (Some(scheduler), Some(handle)) = (&self.scheduler, worker) {
            scheduler.stop();
            if let Err(e) = handle.await {
                error!(error = %e, "Drain scheduler task failed");
            }
        }

        self.components.pool.close().await;
        served
    }
}
