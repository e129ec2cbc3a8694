//! Message and payload types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use stylebatch_core::{JobId, WorkItemId};

use crate::error::{QueueError, QueueResult};

/// Queue-assigned message identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(pub i64);

impl MessageId {
    /// Returns the raw id.
    #[must_use]
    pub const fn value(self) -> i64 {
        self.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Schema of every message body on the queue.
///
/// Encoded as JSON with a `kind` tag, e.g.
/// `{"kind":"generate_artifact","work_item_id":"...","job_id":"..."}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TaskPayload {
    /// Generate and upload the artifact of one work item.
    GenerateArtifact {
        work_item_id: WorkItemId,
        job_id: JobId,
    },
}

impl TaskPayload {
    /// Payload for one work item.
    #[must_use]
    pub const fn generate(job_id: JobId, work_item_id: WorkItemId) -> Self {
        Self::GenerateArtifact {
            work_item_id,
            job_id,
        }
    }

    /// Work item the payload refers to.
    #[must_use]
    pub const fn work_item_id(&self) -> WorkItemId {
        match self {
            Self::GenerateArtifact { work_item_id, .. } => *work_item_id,
        }
    }

    /// Job the payload refers to.
    #[must_use]
    pub const fn job_id(&self) -> JobId {
        match self {
            Self::GenerateArtifact { job_id, .. } => *job_id,
        }
    }

    /// Encodes the payload as a message body.
    pub fn to_body(&self) -> QueueResult<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// A leased message.
///
/// The body is kept raw; it is decoded at the worker through
/// [`QueueMessage::payload`] so that a malformed body can be deleted
/// instead of blocking the queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueMessage {
    pub message_id: MessageId,
    pub body: String,
    /// When the lease runs out and the message becomes visible again.
    pub lease_expiry: DateTime<Utc>,
    /// Number of times this message has been leased, this one included.
    pub delivery_count: u32,
}

impl QueueMessage {
    /// Decodes the body against the payload schema.
    pub fn payload(&self) -> QueueResult<TaskPayload> {
        serde_json::from_str(&self.body).map_err(|e| QueueError::Poison(e.to_string()))
    }
}

/// Message counts of one queue.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueStats {
    /// All messages not yet deleted.
    pub total: u64,
    /// Messages a `read` could lease right now.
    pub visible: u64,
    /// Messages hidden by an unexpired lease or delay.
    pub leased: u64,
}
