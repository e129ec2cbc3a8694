//! MySQL work item repository implementation.

use super::{parse_uuid, to_u32};
use crate::{
    traits::{ItemCounts, WorkItemRepository},
    DatabasePoolInterface,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::FromRow;
use std::sync::Arc;
use stylebatch_core::{
    BatchError, BatchResult, JobId, WorkItem, WorkItemChange, WorkItemId, WorkItemStatus,
};
use tracing::debug;

const SELECT_COLUMNS: &str = r#"
    SELECT id, job_id, subject, status, attempts, artifact_path, artifact_url, error,
           created_at, updated_at
    FROM work_items
"#;

/// MySQL work item repository implementation.
#[derive(Clone)]
pub struct MySqlWorkItemRepository {
    pool: Arc<dyn DatabasePoolInterface>,
}

impl MySqlWorkItemRepository {
    /// Creates a new MySQL work item repository.
    #[must_use]
    pub fn new(pool: Arc<dyn DatabasePoolInterface>) -> Self {
        Self { pool }
    }
}

/// Database row representation of a work item.
#[derive(Debug, FromRow)]
struct WorkItemRow {
    id: String,
    job_id: String,
    subject: String,
    status: String,
    attempts: u32,
    artifact_path: Option<String>,
    artifact_url: Option<String>,
    error: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<WorkItemRow> for WorkItem {
    type Error = BatchError;

    fn try_from(row: WorkItemRow) -> Result<Self, Self::Error> {
        Ok(WorkItem {
            id: WorkItemId::from_uuid(parse_uuid(&row.id)?),
            job_id: JobId::from_uuid(parse_uuid(&row.job_id)?),
            subject: row.subject,
            status: row.status.parse()?,
            attempts: row.attempts,
            artifact_path: row.artifact_path,
            artifact_url: row.artifact_url,
            error: row.error,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct CountRow {
    total: i64,
    done: i64,
}

#[async_trait]
impl WorkItemRepository for MySqlWorkItemRepository {
    async fn find_by_id(&self, id: WorkItemId) -> BatchResult<Option<WorkItem>> {
        debug!(work_item_id = %id, "Finding work item by id");

        let row = sqlx::query_as::<_, WorkItemRow>(&format!("{} WHERE id = ?", SELECT_COLUMNS))
            .bind(id.to_string())
            .fetch_optional(self.pool.inner())
            .await?;

        row.map(WorkItem::try_from).transpose()
    }

    async fn find_by_job(&self, job_id: JobId) -> BatchResult<Vec<WorkItem>> {
        debug!(job_id = %job_id, "Finding work items by job");

        let rows = sqlx::query_as::<_, WorkItemRow>(&format!(
            "{} WHERE job_id = ? ORDER BY created_at, id",
            SELECT_COLUMNS
        ))
        .bind(job_id.to_string())
        .fetch_all(self.pool.inner())
        .await?;

        rows.into_iter().map(WorkItem::try_from).collect()
    }

    async fn find_by_job_and_status(
        &self,
        job_id: JobId,
        status: WorkItemStatus,
    ) -> BatchResult<Vec<WorkItem>> {
        debug!(job_id = %job_id, status = %status, "Finding work items by job and status");

        let rows = sqlx::query_as::<_, WorkItemRow>(&format!(
            "{} WHERE job_id = ? AND status = ? ORDER BY created_at, id",
            SELECT_COLUMNS
        ))
        .bind(job_id.to_string())
        .bind(status.as_str())
        .fetch_all(self.pool.inner())
        .await?;

        rows.into_iter().map(WorkItem::try_from).collect()
    }

    async fn count_by_job(&self, job_id: JobId) -> BatchResult<ItemCounts> {
        let row = sqlx::query_as::<_, CountRow>(
            r#"
            SELECT COUNT(*) AS total,
                   CAST(COALESCE(SUM(status = 'done'), 0) AS SIGNED) AS done
            FROM work_items
            WHERE job_id = ?
            "#,
        )
        .bind(job_id.to_string())
        .fetch_one(self.pool.inner())
        .await?;

        Ok(ItemCounts {
            total: to_u32(row.total, "total")?,
            done: to_u32(row.done, "done")?,
        })
    }

    async fn compare_and_set(
        &self,
        id: WorkItemId,
        expected: WorkItemStatus,
        change: WorkItemChange,
    ) -> BatchResult<bool> {
        let next = expected.transition_to(change.target())?;
        debug!(work_item_id = %id, from = %expected, to = %next, "Compare-and-set work item");

        let now = Utc::now();
        let query = match &change {
            WorkItemChange::Claim => sqlx::query(
                r#"
                UPDATE work_items
                SET status = ?, attempts = attempts + 1, updated_at = ?
                WHERE id = ? AND status = ?
                "#,
            )
            .bind(next.as_str())
            .bind(now),
            WorkItemChange::Complete {
                artifact_path,
                artifact_url,
            } => sqlx::query(
                r#"
                UPDATE work_items
                SET status = ?, artifact_path = ?, artifact_url = ?, error = NULL, updated_at = ?
                WHERE id = ? AND status = ?
                "#,
            )
            .bind(next.as_str())
            .bind(artifact_path.clone())
            .bind(artifact_url.clone())
            .bind(now),
            WorkItemChange::Release { error } | WorkItemChange::Fail { error } => sqlx::query(
                r#"
                UPDATE work_items
                SET status = ?, error = ?, updated_at = ?
                WHERE id = ? AND status = ?
                "#,
            )
            .bind(next.as_str())
            .bind(error.clone())
            .bind(now),
            WorkItemChange::Cancel => sqlx::query(
                r#"
                UPDATE work_items
                SET status = ?, updated_at = ?
                WHERE id = ? AND status = ?
                "#,
            )
            .bind(next.as_str())
            .bind(now),
        };

        let result = query
            .bind(id.to_string())
            .bind(expected.as_str())
            .execute(self.pool.inner())
            .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn delete_by_job(&self, job_id: JobId) -> BatchResult<u64> {
        debug!(job_id = %job_id, "Deleting work items of job");

        let result = sqlx::query("DELETE FROM work_items WHERE job_id = ?")
            .bind(job_id.to_string())
            .execute(self.pool.inner())
            .await?;

        Ok(result.rows_affected())
    }
}
