//! Queue-related DTOs.

use serde::{Deserialize, Serialize};
use std::ops::AddAssign;
use utoipa::ToSchema;
use validator::Validate;

/// Parameters of one drain. Omitted fields fall back to the configured
/// queue defaults.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, Validate, ToSchema)]
pub struct DrainRequest {
    /// Messages leased in one read.
    #[validate(range(min = 1, max = 100, message = "batch_size must be between 1 and 100"))]
    pub batch_size: Option<u32>,

    /// Lease length in seconds.
    #[validate(range(
        min = 1,
        max = 43200,
        message = "visibility_timeout_secs must be between 1 and 43200"
    ))]
    pub visibility_timeout_secs: Option<u64>,

    /// Leases a work item may consume before it is failed.
    #[validate(range(min = 1, max = 100, message = "max_attempts must be between 1 and 100"))]
    pub max_attempts: Option<u32>,
}

/// Outcome counts of one or more drains.
///
/// `succeeded + failed == leased` for a single drain.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct DrainReport {
    pub leased: u32,
    pub succeeded: u32,
    pub failed: u32,
}

impl AddAssign for DrainReport {
    fn add_assign(&mut self, other: Self) {
        self.leased += other.leased;
        self.succeeded += other.succeeded;
        self.failed += other.failed;
    }
}

/// Message counts of the work queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct QueueStatsResponse {
    pub queue: String,
    pub total: u64,
    pub visible: u64,
    pub leased: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use stylebatch_core::ValidateExt;

    #[test]
    fn test_empty_drain_request_is_valid() {
        assert!(DrainRequest::default().validate_request().is_ok());
    }

    #[test]
    fn test_drain_request_ranges() {
        let request = DrainRequest {
            batch_size: Some(0),
            visibility_timeout_secs: Some(50_000),
            max_attempts: Some(101),
        };
        let message = request.validate_request().unwrap_err().to_string();
        assert!(message.contains("batch_size"));
        assert!(message.contains("visibility_timeout_secs"));
        assert!(message.contains("max_attempts"));
    }

    #[test]
    fn test_reports_add_up() {
        let mut total = DrainReport { leased: 2, succeeded: 1, failed: 1 };
        total += DrainReport { leased: 3, succeeded: 3, failed: 0 };
        assert_eq!(total, DrainReport { leased: 5, succeeded: 4, failed: 1 });
    }
}
