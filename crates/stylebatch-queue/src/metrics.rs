//! Metrics for queue traffic.

use metrics::{counter, describe_counter, describe_histogram, histogram};
use std::time::Duration;

/// Metric names for the queue.
pub mod names {
    /// Total messages sent.
    pub const MESSAGES_SENT_TOTAL: &str = "stylebatch_queue_messages_sent_total";
    /// Total messages leased by `read`.
    pub const MESSAGES_LEASED_TOTAL: &str = "stylebatch_queue_messages_leased_total";
    /// Total messages deleted.
    pub const MESSAGES_DELETED_TOTAL: &str = "stylebatch_queue_messages_deleted_total";
    /// Duration of a backend operation in seconds.
    pub const OPERATION_DURATION_SECONDS: &str = "stylebatch_queue_operation_duration_seconds";
}

/// Register all metric descriptions.
pub fn register_metrics() {
    describe_counter!(names::MESSAGES_SENT_TOTAL, "Total number of messages sent");
    describe_counter!(
        names::MESSAGES_LEASED_TOTAL,
        "Total number of messages leased by readers"
    );
    describe_counter!(
        names::MESSAGES_DELETED_TOTAL,
        "Total number of messages acknowledged and deleted"
    );
    describe_histogram!(
        names::OPERATION_DURATION_SECONDS,
        "Queue backend operation duration in seconds"
    );
}

/// Queue metrics recorder.
#[derive(Clone)]
pub struct QueueMetrics;

impl QueueMetrics {
    /// Record a message sent.
    pub fn message_sent(queue: &str) {
        counter!(names::MESSAGES_SENT_TOTAL, "queue" => queue.to_string()).increment(1);
    }

    /// Record messages leased by one read.
    pub fn messages_leased(queue: &str, count: usize) {
        counter!(names::MESSAGES_LEASED_TOTAL, "queue" => queue.to_string())
            .increment(count as u64);
    }

    /// Record a message deleted.
    pub fn message_deleted(queue: &str) {
        counter!(names::MESSAGES_DELETED_TOTAL, "queue" => queue.to_string()).increment(1);
    }

    /// Record how long a backend operation took.
    pub fn operation(queue: &str, operation: &'static str, duration: Duration) {
        histogram!(
            names::OPERATION_DURATION_SECONDS,
            "queue" => queue.to_string(),
            "operation" => operation
        )
        .record(duration.as_secs_f64());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_without_recorder_is_noop() {
        register_metrics();
        QueueMetrics::message_sent("image_jobs");
        QueueMetrics::messages_leased("image_jobs", 3);
        QueueMetrics::message_deleted("image_jobs");
        QueueMetrics::operation("image_jobs", "read", Duration::from_millis(4));
    }
}
