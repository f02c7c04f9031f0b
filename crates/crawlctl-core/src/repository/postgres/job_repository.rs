//! PostgreSQL-backed Durable Job Store (§2, §6 schema)

use async_trait::async_trait;
use sqlx::{Pool, Postgres};

use crate::jobs::job::{Job, JobStatus};
use crate::repository::traits::JobRepositoryTrait;
use crate::{Error, Result};

#[derive(Clone)]
pub struct PostgresJobRepository {
    pool: Pool<Postgres>,
}

impl PostgresJobRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl JobRepositoryTrait for PostgresJobRepository {
    async fn insert_pending(&self, job: &Job) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO job (id, status, result_html, urls_submitted, urls_succeeded,
                              urls_failed, user_id, execution_time_ms, started_at,
                              completed_at, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(&job.id)
        .bind(&job.status)
        .bind(&job.result_html)
        .bind(job.urls_submitted)
        .bind(job.urls_succeeded)
        .bind(job.urls_failed)
        .bind(&job.user_id)
        .bind(job.execution_time_ms)
        .bind(job.started_at)
        .bind(job.completed_at)
        .bind(job.created_at)
        .bind(job.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Job>> {
        let job = sqlx::query_as::<_, Job>("SELECT * FROM job WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(job)
    }

    async fn mark_running(&self, id: &str) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE job SET status = 'RUNNING', started_at = NOW(), updated_at = NOW()
            WHERE id = $1 AND status = 'PENDING'
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(Error::store(format!(
                "job {id} was not PENDING, refusing to mark RUNNING"
            )));
        }

        Ok(())
    }

    async fn mark_terminal(
        &self,
        id: &str,
        status: JobStatus,
        urls_succeeded: i32,
        urls_failed: i32,
        execution_time_ms: i64,
        result_html: Option<&str>,
    ) -> Result<()> {
        if !status.is_terminal() {
            return Err(Error::internal(format!(
                "mark_terminal called with non-terminal status {status}"
            )));
        }

        let result = sqlx::query(
            r#"
            UPDATE job
            SET status = $2, urls_succeeded = $3, urls_failed = $4,
                execution_time_ms = $5, result_html = $6,
                completed_at = NOW(), updated_at = NOW()
            WHERE id = $1 AND status = 'RUNNING'
            "#,
        )
        .bind(id)
        .bind(status.to_string())
        .bind(urls_succeeded)
        .bind(urls_failed)
        .bind(execution_time_ms)
        .bind(result_html)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(Error::store(format!(
                "job {id} was not RUNNING, refusing terminal write"
            )));
        }

        Ok(())
    }

    async fn recent_succeeded_durations(
        &self,
        user_id: Option<&str>,
        limit: i64,
    ) -> Result<Vec<(i64, i32)>> {
        let rows: Vec<(i64, i32)> = if let Some(user_id) = user_id {
            sqlx::query_as(
                "SELECT execution_time_ms, urls_submitted FROM job \
                 WHERE status = 'SUCCEEDED' AND execution_time_ms IS NOT NULL AND user_id = $1 \
                 ORDER BY completed_at DESC LIMIT $2",
            )
            .bind(user_id)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?
        } else {
            sqlx::query_as(
                "SELECT execution_time_ms, urls_submitted FROM job \
                 WHERE status = 'SUCCEEDED' AND execution_time_ms IS NOT NULL \
                 ORDER BY completed_at DESC LIMIT $1",
            )
            .bind(limit)
            .fetch_all(&self.pool)
            .await?
        };

        Ok(rows)
    }
}
