//! Redis-backed queue implementation.

mod queue;

pub use queue::RedisQueue;

use crate::error::{QueueError, QueueResult};
use deadpool_redis::{Config, Pool, Runtime};
use stylebatch_config::RedisConfig;
use tracing::info;

/// Create a Redis connection pool and verify it with a `PING`.
pub async fn create_pool(config: &RedisConfig) -> QueueResult<Pool> {
    info!("Creating Redis connection pool for queue...");

    let pool = Config::from_url(&config.url)
        .builder()
        .map_err(|e| QueueError::Configuration(format!("Invalid Redis config: {e}")))?
        .max_size(config.pool_size as usize)
        .runtime(Runtime::Tokio1)
        .build()
        .map_err(|e| QueueError::Configuration(format!("Failed to create pool: {e}")))?;

    let mut conn = pool.get().await?;
    redis::cmd("PING").query_async::<String>(&mut *conn).await?;

    info!("Redis connection pool created successfully");

    Ok(pool)
}

/// Redis key builder for one queue.
#[derive(Debug, Clone)]
pub struct RedisKeys {
    base: String,
}

impl RedisKeys {
    /// Create a key builder for `queue_name` under `prefix`.
    pub fn new(prefix: &str, queue_name: &str) -> Self {
        Self {
            base: format!("{prefix}:{queue_name}"),
        }
    }

    /// Message ids scored by the epoch millisecond they become visible.
    pub fn visible(&self) -> String {
        format!("{}:visible", self.base)
    }

    /// Hash: message id -> body.
    pub fn messages(&self) -> String {
        format!("{}:msg", self.base)
    }

    /// Hash: message id -> delivery count.
    pub fn reads(&self) -> String {
        format!("{}:reads", self.base)
    }

    /// Message id sequence.
    pub fn sequence(&self) -> String {
        format!("{}:seq", self.base)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redis_keys() {
        let keys = RedisKeys::new("stylebatch:queue", "image_jobs");

        assert_eq!(keys.visible(), "stylebatch:queue:image_jobs:visible");
        assert_eq!(keys.messages(), "stylebatch:queue:image_jobs:msg");
        assert_eq!(keys.reads(), "stylebatch:queue:image_jobs:reads");
        assert_eq!(keys.sequence(), "stylebatch:queue:image_jobs:seq");
    }

    #[tokio::test]
    async fn test_create_pool_rejects_bad_url() {
        let config = RedisConfig {
            url: "not-a-url".to_string(),
            pool_size: 1,
        };
        assert!(create_pool(&config).await.is_err());
    }
}
