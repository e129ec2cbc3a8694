//! Catalog records consumed by the job submitter and worker.

use crate::{StyleId, SubjectListId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Placeholder substituted with the subject in a prompt template.
pub const SUBJECT_PLACEHOLDER: &str = "{subject}";

/// A style: how every subject of a job is rendered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Style {
    pub id: StyleId,
    pub name: String,
    pub prompt_template: String,
    pub negative_prompt: Option<String>,
    /// Free-form generation parameters forwarded to the generation service.
    pub parameters: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl Style {
    /// Builds the concrete prompt for `subject`.
    ///
    /// Every placeholder is replaced. A template without one is appended
    /// to the subject as a style suffix.
    #[must_use]
    pub fn render_prompt(&self, subject: &str) -> String {
        let template = self.prompt_template.trim();
        if template.contains(SUBJECT_PLACEHOLDER) {
            template.replace(SUBJECT_PLACEHOLDER, subject)
        } else if template.is_empty() {
            subject.to_string()
        } else {
            format!("{}, {}", subject, template)
        }
    }
}

/// A named list of subjects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectList {
    pub id: SubjectListId,
    pub name: String,
    pub subjects: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl SubjectList {
    /// Trimmed subjects with blank entries removed, in list order.
    #[must_use]
    pub fn normalized_subjects(&self) -> Vec<String> {
        self.subjects
            .iter()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    }
}
