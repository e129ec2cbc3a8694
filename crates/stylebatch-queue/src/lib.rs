//! # Stylebatch Queue
//!
//! Leased-delivery message channel used to distribute work items to
//! workers.
//!
//! ## Semantics
//!
//! - `read(n, vt)` leases up to `n` visible messages and hides them for
//!   `vt`. Each returned message carries its delivery count.
//! - `delete(id)` acknowledges a message permanently.
//! - A lease that expires without a delete makes the message visible
//!   again. Redelivery is the only retry mechanism.
//!
//! No ordering across messages is guaranteed.
//!
//! ## Backends
//!
//! - [`RedisQueue`]: shared across processes (sorted set of ids scored by
//!   visibility time, hash of bodies, hash of delivery counts).
//! - [`InMemoryQueue`]: process-local, for development and tests.

pub mod error;
pub mod memory;
pub mod message;
pub mod metrics;
pub mod queue;
pub mod redis;

pub use error::{QueueError, QueueResult};
pub use memory::InMemoryQueue;
pub use message::{MessageId, QueueMessage, QueueStats, TaskPayload};
pub use queue::{DurableQueue, QueueHealthCheck};
pub use redis::{create_pool, RedisQueue};

use std::sync::Arc;
use stylebatch_config::{QueueBackend, QueueConfig, RedisConfig};

/// Builds the queue backend selected by configuration.
pub async fn build_queue(
    queue: &QueueConfig,
    redis: &RedisConfig,
) -> QueueResult<Arc<dyn DurableQueue>> {
    match queue.backend {
        QueueBackend::Redis => {
            let pool = create_pool(redis).await?;
            Ok(Arc::new(RedisQueue::new(pool, &queue.key_prefix, &queue.name)))
        }
        QueueBackend::Memory => Ok(Arc::new(InMemoryQueue::new(&queue.name))),
    }
}
