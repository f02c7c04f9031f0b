//! Repository traits for database abstraction
//!
//! These traits define the interface that all database implementations must provide.

use async_trait::async_trait;

use crate::jobs::job::{Job, JobStatus};
use crate::Result;

/// Durable Job Store repository — database agnostic (§2 DJS)
#[async_trait]
pub trait JobRepositoryTrait: Send + Sync + 'static {
    /// Insert a new PENDING job row. Called by JID submit, before the task
    /// is published to the transport (§4.1 ordering invariant).
    async fn insert_pending(&self, job: &Job) -> Result<()>;

    /// Fetch a job by id
    async fn find_by_id(&self, id: &str) -> Result<Option<Job>>;

    /// Transition a job to RUNNING, stamping `started_at`
    async fn mark_running(&self, id: &str) -> Result<()>;

    /// Transition a job to a terminal state, stamping completion fields
    async fn mark_terminal(
        &self,
        id: &str,
        status: JobStatus,
        urls_succeeded: i32,
        urls_failed: i32,
        execution_time_ms: i64,
        result_html: Option<&str>,
    ) -> Result<()>;

    /// Most recent SUCCEEDED jobs' `(execution_time_ms, urls_submitted)`,
    /// optionally scoped to one user, used by the resource estimator (§4.2)
    async fn recent_succeeded_durations(
        &self,
        user_id: Option<&str>,
        limit: i64,
    ) -> Result<Vec<(i64, i32)>>;
}
