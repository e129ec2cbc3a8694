//! Process-local queue.

use crate::error::QueueResult;
use crate::message::{MessageId, QueueMessage, QueueStats, TaskPayload};
use crate::metrics::QueueMetrics;
use crate::queue::DurableQueue;
use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::debug;

#[derive(Debug)]
struct Entry {
    body: String,
    visible_at: DateTime<Utc>,
    reads: u32,
}

#[derive(Debug, Default)]
struct State {
    next_id: i64,
    entries: BTreeMap<i64, Entry>,
}

/// In-memory durable queue with the same leasing rules as [`crate::RedisQueue`].
///
/// Messages do not survive the process. Leases are measured against the
/// wall clock, so [`InMemoryQueue::expire_leases`] exists to let tests and
/// local tooling trigger redelivery without waiting.
#[derive(Debug)]
pub struct InMemoryQueue {
    name: String,
    state: Mutex<State>,
}

impl InMemoryQueue {
    /// Create an empty queue.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            state: Mutex::new(State::default()),
        }
    }

    /// Enqueues a raw body, bypassing the payload schema.
    pub fn send_raw(&self, body: impl Into<String>) -> MessageId {
        self.push(body.into(), Utc::now())
    }

    /// Makes every leased or delayed message visible immediately.
    pub fn expire_leases(&self) {
        let now = Utc::now();
        let mut state = self.state.lock();
        for entry in state.entries.values_mut() {
            if entry.visible_at > now {
                entry.visible_at = now;
            }
        }
    }

    /// Number of messages not yet deleted.
    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    /// Returns true if every message has been deleted.
    pub fn is_empty(&self) -> bool {
        self.state.lock().entries.is_empty()
    }

    /// Decoded payloads of every message still stored, in send order.
    pub fn payloads(&self) -> Vec<TaskPayload> {
        self.state
            .lock()
            .entries
            .values()
            .filter_map(|entry| serde_json::from_str(&entry.body).ok())
            .collect()
    }

    fn push(&self, body: String, visible_at: DateTime<Utc>) -> MessageId {
        let mut state = self.state.lock();
        state.next_id += 1;
        let id = state.next_id;
        state.entries.insert(
            id,
            Entry {
                body,
                visible_at,
                reads: 0,
            },
        );
        MessageId(id)
    }

    fn offset(duration: Duration) -> ChronoDuration {
        ChronoDuration::from_std(duration).unwrap_or(ChronoDuration::MAX)
    }
}

#[async_trait]
impl DurableQueue for InMemoryQueue {
    fn name(&self) -> &str {
        &self.name
    }

    async fn send(&self, payload: &TaskPayload, delay: Duration) -> QueueResult<MessageId> {
        let body = payload.to_body()?;
        let visible_at = Utc::now()
            .checked_add_signed(Self::offset(delay))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        let id = self.push(body, visible_at);

        QueueMetrics::message_sent(&self.name);
        debug!(queue = %self.name, message_id = %id, "Sent message");
        Ok(id)
    }

    async fn read(
        &self,
        batch_size: u32,
        visibility_timeout: Duration,
    ) -> QueueResult<Vec<QueueMessage>> {
        let now = Utc::now();
        let lease_expiry = now
            .checked_add_signed(Self::offset(visibility_timeout))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);

        let mut state = self.state.lock();
        let messages: Vec<QueueMessage> = state
            .entries
            .iter_mut()
            .filter(|(_, entry)| entry.visible_at <= now)
            .take(batch_size as usize)
            .map(|(id, entry)| {
                entry.visible_at = lease_expiry;
                entry.reads += 1;
                QueueMessage {
                    message_id: MessageId(*id),
                    body: entry.body.clone(),
                    lease_expiry,
                    delivery_count: entry.reads,
                }
            })
            .collect();
        drop(state);

        QueueMetrics::messages_leased(&self.name, messages.len());
        Ok(messages)
    }

    async fn delete(&self, message_id: MessageId) -> QueueResult<bool> {
        let removed = self
            .state
            .lock()
            .entries
            .remove(&message_id.value())
            .is_some();
        if removed {
            QueueMetrics::message_deleted(&self.name);
        }
        Ok(removed)
    }

    async fn stats(&self) -> QueueResult<QueueStats> {
        let now = Utc::now();
        let state = self.state.lock();
        let total = state.entries.len() as u64;
        let visible = state
            .entries
            .values()
            .filter(|entry| entry.visible_at <= now)
            .count() as u64;

        Ok(QueueStats {
            total,
            visible,
            leased: total - visible,
        })
    }

    async fn health_check(&self) -> QueueResult<()> {
        Ok(())
    }
}
