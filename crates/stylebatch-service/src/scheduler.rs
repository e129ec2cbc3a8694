//! Cron trigger that runs drains in-process.

use crate::dto::{DrainReport, DrainRequest};
use crate::worker::QueueDrainer;
use chrono::Utc;
use cron::Schedule;
use futures::future::join_all;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use stylebatch_config::WorkerConfig;
use stylebatch_core::{BatchError, BatchResult};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Runs `invocations` concurrent drains on every cron tick.
///
/// Drain errors are logged and the schedule keeps going.
pub struct DrainScheduler {
    drainer: Arc<dyn QueueDrainer>,
    schedule: Schedule,
    invocations: u32,
    shutdown_tx: broadcast::Sender<()>,
    running: Arc<AtomicBool>,
}

impl DrainScheduler {
    /// Create a scheduler from configuration.
    pub fn new(drainer: Arc<dyn QueueDrainer>, config: &WorkerConfig) -> BatchResult<Self> {
        let schedule = Schedule::from_str(&config.schedule).map_err(|e| {
            BatchError::Configuration(format!("Invalid cron expression '{}': {e}", config.schedule))
        })?;
        let (shutdown_tx, _) = broadcast::channel(1);

        Ok(Self {
            drainer,
            schedule,
            invocations: config.invocations.max(1),
            shutdown_tx,
            running: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Whether the loop is running.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Runs one tick: all invocations concurrently, with configured defaults.
    pub async fn tick(&self) -> DrainReport {
        let drains = (0..self.invocations).map(|_| self.drainer.drain(DrainRequest::default()));

        let mut total = DrainReport::default();
        for result in join_all(drains).await {
            match result {
                Ok(report) => total += report,
                Err(e) => error!(error = %e, "Scheduled drain failed"),
            }
        }
        total
    }

    /// Runs until [`DrainScheduler::stop`] is called.
    pub async fn run(&self) {
        let mut shutdown_rx = self.shutdown_tx.subscribe();
        self.running.store(true, Ordering::SeqCst);
        info!(invocations = self.invocations, "Drain scheduler started");

        while self.running.load(Ordering::SeqCst) {
            let Some(next) = self.schedule.upcoming(Utc).next() else {
                warn!("Cron schedule has no upcoming runs");
                break;
            };
            let wait = (next - Utc::now()).to_std().unwrap_or(Duration::ZERO);

            tokio::select! {
                _ = shutdown_rx.recv() => {
                    info!("Drain scheduler received shutdown signal");
                    break;
                }
                () = tokio::time::sleep(wait) => {
                    let report = self.tick().await;
                    debug!(
                        leased = report.leased,
                        succeeded = report.succeeded,
                        failed = report.failed,
                        "Scheduled drain tick"
                    );
                }
            }
        }

        self.running.store(false, Ordering::SeqCst);
        info!("Drain scheduler stopped");
    }

    /// Spawns the loop on the runtime.
    pub fn spawn(self: Arc<Self>) -> JoinHandle<()> {
        tokio::spawn(async move { self.run().await })
    }

    /// Signals the loop to stop after the current tick.
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
        let _ = self.shutdown_tx.send(());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dto::QueueStatsResponse;
    use async_trait::async_trait;
    use std::sync::atomic::AtomicU32;

    struct CountingDrainer {
        calls: AtomicU32,
        fail: bool,
    }

    #[async_trait]
    impl QueueDrainer for CountingDrainer {
        async fn drain(&self, _request: DrainRequest) -> BatchResult<DrainReport> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(BatchError::dependency("queue", "down"));
            }
            Ok(DrainReport {
                leased: 2,
                succeeded: 1,
                failed: 1,
            })
        }

        async fn stats(&self) -> BatchResult<QueueStatsResponse> {
            Ok(QueueStatsResponse {
                queue: "image_jobs".to_string(),
                total: 0,
                visible: 0,
                leased: 0,
            })
        }
    }

    fn config(schedule: &str, invocations: u32) -> WorkerConfig {
        WorkerConfig {
            enabled: true,
            schedule: schedule.to_string(),
            invocations,
        }
    }

    #[test]
    fn test_invalid_cron_is_configuration_error() {
        let drainer = Arc::new(CountingDrainer { calls: AtomicU32::new(0), fail: false });
        let result = DrainScheduler::new(drainer, &config("every minute", 1));
        assert!(matches!(result, Err(BatchError::Configuration(_))));
    }

    #[tokio::test]
    async fn test_tick_runs_all_invocations_and_sums() {
        let drainer = Arc::new(CountingDrainer { calls: AtomicU32::new(0), fail: false });
        let scheduler = DrainScheduler::new(drainer.clone(), &config("*/10 * * * * *", 3)).unwrap();

        let report = scheduler.tick().await;

        assert_eq!(drainer.calls.load(Ordering::SeqCst), 3);
        assert_eq!(report, DrainReport { leased: 6, succeeded: 3, failed: 3 });
    }

    #[tokio::test]
    async fn test_tick_survives_failing_drains() {
        let drainer = Arc::new(CountingDrainer { calls: AtomicU32::new(0), fail: true });
        let scheduler = DrainScheduler::new(drainer.clone(), &config("*/10 * * * * *", 2)).unwrap();

        assert_eq!(scheduler.tick().await, DrainReport::default());
        assert_eq!(drainer.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_stop_ends_run_loop() {
        let drainer = Arc::new(CountingDrainer { calls: AtomicU32::new(0), fail: false });
        let scheduler = Arc::new(
            DrainScheduler::new(drainer, &config("0 0 0 1 1 * 2099", 1)).unwrap(),
        );

        let handle = Arc::clone(&scheduler).spawn();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(scheduler.is_running());

        scheduler.stop();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("scheduler did not stop")
            .unwrap();
        assert!(!scheduler.is_running());
    }
}
