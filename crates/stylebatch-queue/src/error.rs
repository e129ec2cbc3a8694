//! Queue error types.

use stylebatch_core::BatchError;
use thiserror::Error;

/// Result type for queue operations.
pub type QueueResult<T> = Result<T, QueueError>;

/// Queue-related errors.
#[derive(Debug, Error)]
pub enum QueueError {
    /// Redis command failed.
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// No connection could be taken from the pool.
    #[error("Redis pool error: {0}")]
    Pool(#[from] deadpool_redis::PoolError),

    /// Outgoing payload could not be encoded.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Message body does not match the payload schema.
    #[error("Poison message: {0}")]
    Poison(String),

    /// Invalid queue configuration.
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl QueueError {
    /// Returns true if the queue itself could not be reached.
    #[must_use]
    pub const fn is_unavailable(&self) -> bool {
        matches!(self, Self::Redis(_) | Self::Pool(_))
    }
}

impl From<QueueError> for BatchError {
    fn from(err: QueueError) -> Self {
        match err {
            QueueError::Redis(_) | QueueError::Pool(_) => Self::Queue(err.to_string()),
            QueueError::Serialization(e) => {
                Self::Internal(format!("failed to encode queue payload: {e}"))
            }
            QueueError::Poison(detail) => Self::PoisonMessage(detail),
            QueueError::Configuration(msg) => Self::Configuration(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_poison_maps_to_poison_message() {
        let err: BatchError = QueueError::Poison("missing field `work_item_id`".into()).into();
        assert!(matches!(err, BatchError::PoisonMessage(ref m) if m.contains("work_item_id")));
        assert_eq!(err.error_code(), "POISON_MESSAGE");
    }

    #[test]
    fn test_configuration_maps_to_configuration() {
        let err: BatchError = QueueError::Configuration("bad url".into()).into();
        assert_eq!(err.status_code(), 500);
    }

    #[test]
    fn test_redis_error_is_unavailable_and_transient() {
        let redis_err = redis::RedisError::from((redis::ErrorKind::IoError, "connection refused"));
        let err = QueueError::from(redis_err);
        assert!(err.is_unavailable());

        let batch: BatchError = err.into();
        assert_eq!(batch.error_code(), "QUEUE_ERROR");
        assert!(batch.is_transient());
    }

    #[test]
    fn test_poison_is_not_unavailable() {
        assert!(!QueueError::Poison("x".into()).is_unavailable());
    }
}
