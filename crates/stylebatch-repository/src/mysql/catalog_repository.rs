//! MySQL catalog repository implementation.

use super::parse_uuid;
use crate::{traits::CatalogRepository, DatabasePoolInterface};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::FromRow;
use std::sync::Arc;
use stylebatch_core::{BatchError, BatchResult, Style, StyleId, SubjectList, SubjectListId};
use tracing::debug;

/// MySQL catalog repository implementation.
#[derive(Clone)]
pub struct MySqlCatalogRepository {
    pool: Arc<dyn DatabasePoolInterface>,
}

impl MySqlCatalogRepository {
    /// Creates a new MySQL catalog repository.
    #[must_use]
    pub fn new(pool: Arc<dyn DatabasePoolInterface>) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct StyleRow {
    id: String,
    name: String,
    prompt_template: String,
    negative_prompt: Option<String>,
    parameters: Json<serde_json::Value>,
    created_at: DateTime<Utc>,
}

impl TryFrom<StyleRow> for Style {
    type Error = BatchError;

    fn try_from(row: StyleRow) -> Result<Self, Self::Error> {
        Ok(Style {
            id: StyleId::from_uuid(parse_uuid(&row.id)?),
            name: row.name,
            prompt_template: row.prompt_template,
            negative_prompt: row.negative_prompt,
            parameters: row.parameters.0,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct SubjectListRow {
    id: String,
    name: String,
    subjects: Json<Vec<String>>,
    created_at: DateTime<Utc>,
}

impl TryFrom<SubjectListRow> for SubjectList {
    type Error = BatchError;

    fn try_from(row: SubjectListRow) -> Result<Self, Self::Error> {
        Ok(SubjectList {
            id: SubjectListId::from_uuid(parse_uuid(&row.id)?),
            name: row.name,
            subjects: row.subjects.0,
            created_at: row.created_at,
        })
    }
}

#[async_trait]
impl CatalogRepository for MySqlCatalogRepository {
    async fn find_style(&self, id: StyleId) -> BatchResult<Option<Style>> {
        debug!(style_id = %id, "Finding style by id");

        let row = sqlx::query_as::<_, StyleRow>(
            r#"
            SELECT id, name, prompt_template, negative_prompt, parameters, created_at
            FROM styles
            WHERE id = ?
            "#,
        )
        .bind(id.to_string())
        .fetch_optional(self.pool.inner())
        .await?;

        row.map(Style::try_from).transpose()
    }

    async fn find_subject_list(&self, id: SubjectListId) -> BatchResult<Option<SubjectList>> {
        debug!(subject_list_id = %id, "Finding subject list by id");

        let row = sqlx::query_as::<_, SubjectListRow>(
            r#"
            SELECT id, name, subjects, created_at
            FROM subject_lists
            WHERE id = ?
            "#,
        )
        .bind(id.to_string())
        .fetch_optional(self.pool.inner())
        .await?;

        row.map(SubjectList::try_from).transpose()
    }
}
