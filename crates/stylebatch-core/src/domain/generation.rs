//! Generation request/response types and artifact naming.

use crate::{JobId, WorkItemId};
use serde::{Deserialize, Serialize};

/// Request sent to the generation service for one work item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub job_id: JobId,
    pub work_item_id: WorkItemId,
    pub subject: String,
    pub prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub negative_prompt: Option<String>,
    pub parameters: serde_json::Value,
}

/// Image bytes returned by the generation service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedImage {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

impl GeneratedImage {
    #[must_use]
    pub fn new(bytes: Vec<u8>, content_type: impl Into<String>) -> Self {
        Self {
            bytes,
            content_type: content_type.into(),
        }
    }

    /// File extension derived from the content type.
    #[must_use]
    pub fn extension(&self) -> &'static str {
        let mime = self
            .content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        match mime.as_str() {
            "image/png" => "png",
            "image/jpeg" | "image/jpg" => "jpg",
            "image/webp" => "webp",
            "image/gif" => "gif",
            _ => "bin",
        }
    }
}

/// Storage prefix holding every artifact of a job.
#[must_use]
pub fn job_artifact_prefix(job_id: JobId) -> String {
    job_id.to_string()
}

/// Storage path of a work item's artifact: `{job_id}/{work_item_id}.{ext}`.
#[must_use]
pub fn artifact_path(job_id: JobId, work_item_id: WorkItemId, extension: &str) -> String {
    format!("{}/{}.{}", job_id, work_item_id, extension)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_from_content_type() {
        assert_eq!(GeneratedImage::new(vec![], "image/png").extension(), "png");
        assert_eq!(GeneratedImage::new(vec![], "image/jpeg").extension(), "jpg");
        assert_eq!(
            GeneratedImage::new(vec![], "image/webp; charset=binary").extension(),
            "webp"
        );
        assert_eq!(GeneratedImage::new(vec![], "IMAGE/GIF").extension(), "gif");
        assert_eq!(
            GeneratedImage::new(vec![], "application/octet-stream").extension(),
            "bin"
        );
    }

    #[test]
    fn test_artifact_path_layout() {
        let job_id = JobId::new();
        let item_id = WorkItemId::new();
        let path = artifact_path(job_id, item_id, "png");
        assert!(path.starts_with(&job_artifact_prefix(job_id)));
        assert_eq!(path, format!("{}/{}.png", job_id, item_id));
    }
}
