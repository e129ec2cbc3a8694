//! MySQL job repository implementation.

use super::{parse_uuid, sql_in_list};
use crate::{traits::JobRepository, DatabasePoolInterface};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, MySql, QueryBuilder};
use std::sync::Arc;
use stylebatch_core::{
    BatchError, BatchResult, Job, JobId, JobStatus, StyleId, SubjectListId, WorkItem,
};
use tracing::{debug, info};

/// Rows per multi-row insert, well below MySQL's placeholder limit.
const MAX_ROWS_PER_INSERT: usize = 1000;

/// MySQL job repository implementation.
#[derive(Clone)]
pub struct MySqlJobRepository {
    pool: Arc<dyn DatabasePoolInterface>,
}

impl MySqlJobRepository {
    /// Creates a new MySQL job repository.
    #[must_use]
    pub fn new(pool: Arc<dyn DatabasePoolInterface>) -> Self {
        Self { pool }
    }

    async fn fetch(&self, id: JobId) -> BatchResult<Option<Job>> {
        let row = sqlx::query_as::<_, JobRow>(
            r#"
            SELECT id, style_id, subject_list_id, total, completed, status, error,
                   created_at, updated_at
            FROM jobs
            WHERE id = ?
            "#,
        )
        .bind(id.to_string())
        .fetch_optional(self.pool.inner())
        .await?;

        row.map(Job::try_from).transpose()
    }
}

/// Database row representation of a job.
#[derive(Debug, FromRow)]
struct JobRow {
    id: String,
    style_id: String,
    subject_list_id: String,
    total: u32,
    completed: u32,
    status: String,
    error: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<JobRow> for Job {
    type Error = BatchError;

    fn try_from(row: JobRow) -> Result<Self, Self::Error> {
        Ok(Job {
            id: JobId::from_uuid(parse_uuid(&row.id)?),
            style_id: StyleId::from_uuid(parse_uuid(&row.style_id)?),
            subject_list_id: SubjectListId::from_uuid(parse_uuid(&row.subject_list_id)?),
            total: row.total,
            completed: row.completed,
            status: row.status.parse()?,
            error: row.error,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[async_trait]
impl JobRepository for MySqlJobRepository {
    async fn create_with_items(&self, job: &Job, items: &[WorkItem]) -> BatchResult<()> {
        debug!(job_id = %job.id, items = items.len(), "Creating job with work items");

        let mut tx = self.pool.inner().begin().await?;

        sqlx::query(
            r#"
            INSERT INTO jobs (id, style_id, subject_list_id, total, completed, status, error,
                              created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(job.id.to_string())
        .bind(job.style_id.to_string())
        .bind(job.subject_list_id.to_string())
        .bind(job.total)
        .bind(job.completed)
        .bind(job.status.as_str())
        .bind(&job.error)
        .bind(job.created_at)
        .bind(job.updated_at)
        .execute(&mut *tx)
        .await?;

        for chunk in items.chunks(MAX_ROWS_PER_INSERT) {
            let mut builder: QueryBuilder<MySql> = QueryBuilder::new(
                "INSERT INTO work_items (id, job_id, subject, status, attempts, created_at, updated_at) ",
            );
            builder.push_values(chunk, |mut b, item| {
                b.push_bind(item.id.to_string())
                    .push_bind(item.job_id.to_string())
                    .push_bind(&item.subject)
                    .push_bind(item.status.as_str())
                    .push_bind(item.attempts)
                    .push_bind(item.created_at)
                    .push_bind(item.updated_at);
            });
            builder.build().execute(&mut *tx).await?;
        }

        tx.commit().await?;

        info!(job_id = %job.id, total = job.total, "Job persisted");
        Ok(())
    }

    async fn find_by_id(&self, id: JobId) -> BatchResult<Option<Job>> {
        debug!(job_id = %id, "Finding job by id");
        self.fetch(id).await
    }

    async fn update_status(
        &self,
        id: JobId,
        next: JobStatus,
        error: Option<&str>,
    ) -> BatchResult<bool> {
        debug!(job_id = %id, status = %next, "Updating job status");

        let sources = JobStatus::sources_of(next);
        let sql = format!(
            r#"
            UPDATE jobs
            SET status = ?, error = COALESCE(?, error), updated_at = ?
            WHERE id = ? AND status IN ({})
            "#,
            sql_in_list(sources.iter().map(JobStatus::as_str))
        );

        let result = sqlx::query(&sql)
            .bind(next.as_str())
            .bind(error)
            .bind(Utc::now())
            .bind(id.to_string())
            .execute(self.pool.inner())
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn apply_progress(
        &self,
        id: JobId,
        completed: u32,
        total: u32,
    ) -> BatchResult<Option<Job>> {
        debug!(job_id = %id, completed, total, "Applying job progress");

        let target = JobStatus::from_progress(completed, total);
        let sources = JobStatus::sources_of(target);
        let sql = format!(
            r#"
            UPDATE jobs
            SET completed = ?,
                total = ?,
                status = CASE WHEN status IN ({}) THEN ? ELSE status END,
                updated_at = ?
            WHERE id = ? AND status <> ?
            "#,
            sql_in_list(sources.iter().map(JobStatus::as_str))
        );

        sqlx::query(&sql)
            .bind(completed)
            .bind(total)
            .bind(target.as_str())
            .bind(Utc::now())
            .bind(id.to_string())
            .bind(JobStatus::Cancelled.as_str())
            .execute(self.pool.inner())
            .await?;

        self.fetch(id).await
    }

    async fn delete(&self, id: JobId) -> BatchResult<bool> {
        debug!(job_id = %id, "Deleting job");

        let result = sqlx::query("DELETE FROM jobs WHERE id = ?")
            .bind(id.to_string())
            .execute(self.pool.inner())
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
