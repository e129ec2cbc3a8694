//! Durable queue abstraction.

use crate::error::QueueResult;
use crate::message::{MessageId, QueueMessage, QueueStats, TaskPayload};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use stylebatch_core::{HealthCheck, HealthStatus, Interface};

/// Leased-delivery message channel.
///
/// Implementations must make `read` atomic: a message returned by one
/// reader stays invisible to every other reader until its visibility
/// timeout elapses or it is deleted.
#[async_trait]
pub trait DurableQueue: Interface + Send + Sync {
    /// Name of the queue.
    fn name(&self) -> &str;

    /// Sends a message that becomes visible after `delay`.
    async fn send(&self, payload: &TaskPayload, delay: Duration) -> QueueResult<MessageId>;

    /// Leases up to `batch_size` visible messages for `visibility_timeout`.
    async fn read(
        &self,
        batch_size: u32,
        visibility_timeout: Duration,
    ) -> QueueResult<Vec<QueueMessage>>;

    /// Permanently removes a message. Returns `false` if it was already gone.
    async fn delete(&self, message_id: MessageId) -> QueueResult<bool>;

    /// Current message counts.
    async fn stats(&self) -> QueueResult<QueueStats>;

    /// Verifies the backend is reachable.
    async fn health_check(&self) -> QueueResult<()>;
}

/// Health check over a queue backend.
pub struct QueueHealthCheck {
    queue: Arc<dyn DurableQueue>,
}

impl QueueHealthCheck {
    /// Creates a health check for `queue`.
    #[must_use]
    pub fn new(queue: Arc<dyn DurableQueue>) -> Self {
        Self { queue }
    }
}

#[async_trait]
impl HealthCheck for QueueHealthCheck {
    fn name(&self) -> &str {
        "queue"
    }

    async fn check(&self) -> HealthStatus {
        match self.queue.health_check().await {
            Ok(()) => HealthStatus::Healthy,
            Err(e) => HealthStatus::Unhealthy(e.to_string()),
        }
    }
}
