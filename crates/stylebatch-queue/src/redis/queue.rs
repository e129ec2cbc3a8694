//! Redis queue implementation.

use super::RedisKeys;
use crate::error::QueueResult;
use crate::message::{MessageId, QueueMessage, QueueStats, TaskPayload};
use crate::metrics::QueueMetrics;
use crate::queue::DurableQueue;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use deadpool_redis::Pool;
use redis::{AsyncCommands, Script};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Leases due messages in one round trip.
///
/// KEYS: visible zset, body hash, delivery-count hash.
/// ARGV: now (ms), visibility timeout (ms), limit.
/// Ids whose body is gone are dropped from the zset instead of returned.
const LEASE_SCRIPT: &str = r"
local now = tonumber(ARGV[1])
local vt = tonumber(ARGV[2])
local ids = redis.call('ZRANGEBYSCORE', KEYS[1], '-inf', now, 'LIMIT', 0, tonumber(ARGV[3]))
local leased = {}
for _, id in ipairs(ids) do
  local body = redis.call('HGET', KEYS[2], id)
  if body then
    redis.call('ZADD', KEYS[1], now + vt, id)
    local count = redis.call('HINCRBY', KEYS[3], id, 1)
    table.insert(leased, {id, body, count})
  else
    redis.call('ZREM', KEYS[1], id)
    redis.call('HDEL', KEYS[3], id)
  end
end
return leased
";

/// Redis-backed durable queue.
pub struct RedisQueue {
    pool: Pool,
    keys: RedisKeys,
    name: String,
    lease: Script,
}

impl RedisQueue {
    /// Create a queue named `name` whose keys live under `prefix`.
    pub fn new(pool: Pool, prefix: &str, name: &str) -> Self {
        Self {
            pool,
            keys: RedisKeys::new(prefix, name),
            name: name.to_string(),
            lease: Script::new(LEASE_SCRIPT),
        }
    }

    async fn conn(&self) -> QueueResult<deadpool_redis::Connection> {
        Ok(self.pool.get().await?)
    }

    fn millis(duration: Duration) -> i64 {
        i64::try_from(duration.as_millis()).unwrap_or(i64::MAX)
    }
}

#[async_trait]
impl DurableQueue for RedisQueue {
    fn name(&self) -> &str {
        &self.name
    }

    async fn send(&self, payload: &TaskPayload, delay: Duration) -> QueueResult<MessageId> {
        let started = Instant::now();
        let body = payload.to_body()?;
        let mut conn = self.conn().await?;

        let id: i64 = conn.incr(self.keys.sequence(), 1i64).await?;
        let visible_at = Utc::now().timestamp_millis().saturating_add(Self::millis(delay));

        let _: () = redis::pipe()
            .atomic()
            .hset(self.keys.messages(), id, &body)
            .ignore()
            .zadd(self.keys.visible(), id, visible_at)
            .ignore()
            .query_async(&mut *conn)
            .await?;

        QueueMetrics::message_sent(&self.name);
        QueueMetrics::operation(&self.name, "send", started.elapsed());
        debug!(
            queue = %self.name,
            message_id = id,
            work_item_id = %payload.work_item_id(),
            "Sent message"
        );

        Ok(MessageId(id))
    }

    async fn read(
        &self,
        batch_size: u32,
        visibility_timeout: Duration,
    ) -> QueueResult<Vec<QueueMessage>> {
        if batch_size == 0 {
            return Ok(Vec::new());
        }

        let started = Instant::now();
        let mut conn = self.conn().await?;
        let now = Utc::now().timestamp_millis();
        let vt = Self::millis(visibility_timeout);

        let rows: Vec<(i64, String, i64)> = self
            .lease
            .key(self.keys.visible())
            .key(self.keys.messages())
            .key(self.keys.reads())
            .arg(now)
            .arg(vt)
            .arg(batch_size)
            .invoke_async(&mut *conn)
            .await?;

        let lease_expiry = DateTime::<Utc>::from_timestamp_millis(now.saturating_add(vt))
            .unwrap_or_else(Utc::now);

        let messages: Vec<QueueMessage> = rows
            .into_iter()
            .map(|(id, body, count)| QueueMessage {
                message_id: MessageId(id),
                body,
                lease_expiry,
                delivery_count: u32::try_from(count).unwrap_or(u32::MAX),
            })
            .collect();

        QueueMetrics::messages_leased(&self.name, messages.len());
        QueueMetrics::operation(&self.name, "read", started.elapsed());
        debug!(queue = %self.name, leased = messages.len(), "Leased messages");

        Ok(messages)
    }

    async fn delete(&self, message_id: MessageId) -> QueueResult<bool> {
        let started = Instant::now();
        let mut conn = self.conn().await?;
        let id = message_id.value();

        let (_, removed, _): (i64, i64, i64) = redis::pipe()
            .atomic()
            .zrem(self.keys.visible(), id)
            .hdel(self.keys.messages(), id)
            .hdel(self.keys.reads(), id)
            .query_async(&mut *conn)
            .await?;

        QueueMetrics::operation(&self.name, "delete", started.elapsed());
        if removed > 0 {
            QueueMetrics::message_deleted(&self.name);
            debug!(queue = %self.name, message_id = id, "Deleted message");
        } else {
            warn!(queue = %self.name, message_id = id, "Delete of unknown message");
        }

        Ok(removed > 0)
    }

    async fn stats(&self) -> QueueResult<QueueStats> {
        let mut conn = self.conn().await?;
        let now = Utc::now().timestamp_millis();

        let (total, visible): (u64, u64) = redis::pipe()
            .zcard(self.keys.visible())
            .zcount(self.keys.visible(), "-inf", now)
            .query_async(&mut *conn)
            .await?;

        Ok(QueueStats {
            total,
            visible,
            leased: total.saturating_sub(visible),
        })
    }

    async fn health_check(&self) -> QueueResult<()> {
        let mut conn = self.conn().await?;
        redis::cmd("PING").query_async::<String>(&mut *conn).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_millis_saturates() {
        assert_eq!(RedisQueue::millis(Duration::from_secs(2)), 2000);
        assert_eq!(RedisQueue::millis(Duration::MAX), i64::MAX);
    }
}
