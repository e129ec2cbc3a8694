//! Integration tests for the Redis queue.
//!
//! These tests run against a real Redis server using testcontainers.
//! Requires Docker to be available on the system.

mod common;

use common::TestRedis;
use redis::AsyncCommands;
use std::time::Duration;
use stylebatch_core::{JobId, WorkItemId};
use stylebatch_queue::{DurableQueue, QueueStats, TaskPayload};

const VT: Duration = Duration::from_secs(30);

fn payload() -> TaskPayload {
    TaskPayload::generate(JobId::new(), WorkItemId::new())
}

#[tokio::test]
async fn test_send_then_read() {
    let redis = TestRedis::new().await;
    let queue = redis.queue("image_jobs");
    let sent = payload();

    let id = queue.send(&sent, Duration::ZERO).await.unwrap();
    let messages = queue.read(10, VT).await.unwrap();

    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].message_id, id);
    assert_eq!(messages[0].delivery_count, 1);
    assert_eq!(messages[0].payload().unwrap(), sent);
    assert!(messages[0].lease_expiry > chrono::Utc::now());
}

#[tokio::test]
async fn test_lease_hides_message_until_expiry() {
    let redis = TestRedis::new().await;
    let queue = redis.queue("image_jobs");
    queue.send(&payload(), Duration::ZERO).await.unwrap();

    assert_eq!(queue.read(10, VT).await.unwrap().len(), 1);
    assert!(queue.read(10, VT).await.unwrap().is_empty());

    let stats = queue.stats().await.unwrap();
    assert_eq!(stats, QueueStats { total: 1, visible: 0, leased: 1 });
}

#[tokio::test]
async fn test_expired_lease_redelivers_with_count() {
    let redis = TestRedis::new().await;
    let queue = redis.queue("image_jobs");
    let id = queue.send(&payload(), Duration::ZERO).await.unwrap();

    let first = queue.read(1, Duration::from_millis(200)).await.unwrap();
    assert_eq!(first[0].delivery_count, 1);

    tokio::time::sleep(Duration::from_millis(400)).await;
    let again = queue.read(1, VT).await.unwrap();

    assert_eq!(again.len(), 1);
    assert_eq!(again[0].message_id, id);
    assert_eq!(again[0].delivery_count, 2);
    assert!(queue.read(1, VT).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_read_respects_batch_size() {
    let redis = TestRedis::new().await;
    let queue = redis.queue("image_jobs");
    for _ in 0..5 {
        queue.send(&payload(), Duration::ZERO).await.unwrap();
    }

    assert!(queue.read(0, VT).await.unwrap().is_empty());
    assert_eq!(queue.read(2, VT).await.unwrap().len(), 2);
    assert_eq!(queue.read(10, VT).await.unwrap().len(), 3);
}

#[tokio::test]
async fn test_delayed_send_becomes_visible_later() {
    let redis = TestRedis::new().await;
    let queue = redis.queue("image_jobs");
    queue.send(&payload(), Duration::from_millis(300)).await.unwrap();

    assert!(queue.read(10, VT).await.unwrap().is_empty());
    assert_eq!(queue.stats().await.unwrap().leased, 1);

    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(queue.read(10, VT).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_delete_is_acknowledgement() {
    let redis = TestRedis::new().await;
    let queue = redis.queue("image_jobs");
    let keys = redis.keys("image_jobs");
    let id = queue.send(&payload(), Duration::ZERO).await.unwrap();
    queue.read(1, Duration::from_millis(100)).await.unwrap();

    assert!(queue.delete(id).await.unwrap());
    assert!(!queue.delete(id).await.unwrap());

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(queue.read(10, VT).await.unwrap().is_empty());
    assert_eq!(queue.stats().await.unwrap(), QueueStats::default());

    let mut conn = redis.conn().await;
    let counted: bool = conn.hexists(keys.reads(), id.value()).await.unwrap();
    assert!(!counted);
}

#[tokio::test]
async fn test_lease_drops_ids_without_body() {
    let redis = TestRedis::new().await;
    let queue = redis.queue("image_jobs");
    let keys = redis.keys("image_jobs");
    let orphan = queue.send(&payload(), Duration::ZERO).await.unwrap();
    let kept = queue.send(&payload(), Duration::ZERO).await.unwrap();

    let mut conn = redis.conn().await;
    let _: i64 = conn.hdel(keys.messages(), orphan.value()).await.unwrap();

    let messages = queue.read(10, VT).await.unwrap();

    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].message_id, kept);
    let stats = queue.stats().await.unwrap();
    assert_eq!(stats.total, 1);
}

#[tokio::test]
async fn test_queues_are_isolated_by_name() {
    let redis = TestRedis::new().await;
    let images = redis.queue("image_jobs");
    let other = redis.queue("other_jobs");
    images.send(&payload(), Duration::ZERO).await.unwrap();

    assert!(other.read(10, VT).await.unwrap().is_empty());
    assert_eq!(images.read(10, VT).await.unwrap().len(), 1);
    assert!(other.health_check().await.is_ok());
}
