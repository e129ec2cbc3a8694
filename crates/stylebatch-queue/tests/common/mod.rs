//! Common test infrastructure for Redis queue integration tests.

use deadpool_redis::{Connection, Pool};
use stylebatch_config::RedisConfig;
use stylebatch_queue::redis::RedisKeys;
use stylebatch_queue::{create_pool, RedisQueue};
use testcontainers::{runners::AsyncRunner, ContainerAsync};
use testcontainers_modules::redis::Redis;

pub const KEY_PREFIX: &str = "stylebatch:test";

/// Redis testcontainer with a connected pool.
pub struct TestRedis {
    _container: ContainerAsync<Redis>,
    pool: Pool,
}

impl TestRedis {
    pub async fn new() -> Self {
        let container = Redis::default()
            .start()
            .await
            .expect("Failed to start Redis container");

        let port = container
            .get_host_port_ipv4(6379)
            .await
            .expect("Failed to get Redis port");

        let config = RedisConfig {
            url: format!("redis://127.0.0.1:{}", port),
            pool_size: 4,
        };

        let pool = Self::connect_with_retry(&config, 30).await;

        Self {
            _container: container,
            pool,
        }
    }

    pub fn queue(&self, name: &str) -> RedisQueue {
        RedisQueue::new(self.pool.clone(), KEY_PREFIX, name)
    }

    pub fn keys(&self, name: &str) -> RedisKeys {
        RedisKeys::new(KEY_PREFIX, name)
    }

    pub async fn conn(&self) -> Connection {
        self.pool.get().await.expect("Failed to get Redis connection")
    }

    async fn connect_with_retry(config: &RedisConfig, max_attempts: u32) -> Pool {
        let mut attempts = 0;
        loop {
            attempts += 1;
            match create_pool(config).await {
                Ok(pool) => return pool,
                Err(e) => {
                    if attempts >= max_attempts {
                        panic!("Failed to connect to Redis after {} attempts: {}", max_attempts, e);
                    }
                    tokio::time::sleep(std::time::Duration::from_secs(1)).await;
                }
            }
        }
    }
}
