//! Job-related DTOs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use stylebatch_core::rules::valid_uuid;
use stylebatch_core::{Job, JobId, JobStatus, WorkItem, WorkItemId, WorkItemStatus};
use utoipa::ToSchema;
use validator::Validate;

/// Request to create a job from a style and a subject list.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateJobRequest {
    #[validate(custom(function = "valid_uuid", message = "style_id must be a non-blank UUID"))]
    #[schema(format = Uuid)]
    pub style_id: String,

    #[validate(custom(function = "valid_uuid", message = "subject_list_id must be a non-blank UUID"))]
    #[schema(format = Uuid)]
    pub subject_list_id: String,
}

/// Response to a created job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct CreateJobResponse {
    #[schema(value_type = String, format = Uuid)]
    pub job_id: JobId,
    pub total: u32,
}

/// Work item as exposed by status reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct WorkItemResponse {
    #[schema(value_type = String, format = Uuid)]
    pub id: WorkItemId,
    pub subject: String,
    pub status: WorkItemStatus,
    pub attempts: u32,
    pub artifact_path: Option<String>,
    pub artifact_url: Option<String>,
    pub error: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl From<WorkItem> for WorkItemResponse {
    fn from(item: WorkItem) -> Self {
        Self {
            id: item.id,
            subject: item.subject,
            status: item.status,
            attempts: item.attempts,
            artifact_path: item.artifact_path,
            artifact_url: item.artifact_url,
            error: item.error,
            updated_at: item.updated_at,
        }
    }
}

/// Job with its work items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct JobStatusResponse {
    #[schema(value_type = String, format = Uuid)]
    pub id: JobId,
    #[schema(value_type = String, format = Uuid)]
    pub style_id: stylebatch_core::StyleId,
    #[schema(value_type = String, format = Uuid)]
    pub subject_list_id: stylebatch_core::SubjectListId,
    pub status: JobStatus,
    pub total: u32,
    pub completed: u32,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub items: Vec<WorkItemResponse>,
}

impl JobStatusResponse {
    /// Builds the response from a job and its items.
    #[must_use]
    pub fn new(job: Job, items: Vec<WorkItem>) -> Self {
        Self {
            id: job.id,
            style_id: job.style_id,
            subject_list_id: job.subject_list_id,
            status: job.status,
            total: job.total,
            completed: job.completed,
            error: job.error,
            created_at: job.created_at,
            updated_at: job.updated_at,
            items: items.into_iter().map(WorkItemResponse::from).collect(),
        }
    }
}

/// Result of a resume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ResumeJobResponse {
    #[schema(value_type = String, format = Uuid)]
    pub job_id: JobId,
    /// Fresh messages sent, one per queued work item.
    pub enqueued: u32,
}

/// Result of a cancellation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct CancelJobResponse {
    #[schema(value_type = String, format = Uuid)]
    pub job_id: JobId,
    pub deleted_work_items: u64,
    pub deleted_artifacts: u64,
}

impl CancelJobResponse {
    /// Nothing was removed.
    #[must_use]
    pub const fn empty(job_id: JobId) -> Self {
        Self {
            job_id,
            deleted_work_items: 0,
            deleted_artifacts: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stylebatch_core::ValidateExt;

    fn request(style_id: &str, subject_list_id: &str) -> CreateJobRequest {
        CreateJobRequest {
            style_id: style_id.to_string(),
            subject_list_id: subject_list_id.to_string(),
        }
    }

    #[test]
    fn test_create_job_request_valid() {
        let req = request(
            "0190a5a4-2f7e-7cc2-9f5d-3b1a2c4d5e6f",
            "0190a5a4-2f7e-7cc2-9f5d-3b1a2c4d5e70",
        );
        assert!(req.validate_request().is_ok());
    }

    #[test]
    fn test_create_job_request_blank_ids() {
        let err = request("  ", "").validate_request().unwrap_err();
        let message = err.to_string();
        assert!(message.contains("style_id"));
        assert!(message.contains("subject_list_id"));
    }

    #[test]
    fn test_create_job_request_malformed_id() {
        let err = request("not-a-uuid", "0190a5a4-2f7e-7cc2-9f5d-3b1a2c4d5e70")
            .validate_request()
            .unwrap_err();
        assert!(err.to_string().contains("style_id must be a non-blank UUID"));
    }

    #[test]
    fn test_work_item_response_from_item() {
        let item = WorkItem::new(JobId::new(), "cat");
        let response = WorkItemResponse::from(item.clone());
        assert_eq!(response.id, item.id);
        assert_eq!(response.status, WorkItemStatus::Queued);
        assert_eq!(response.attempts, 0);
    }
}
