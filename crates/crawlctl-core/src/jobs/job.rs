//! Core domain types shared by every component: the durable `Job` record,
//! the wire-level `TaskMessage`, and the `PrioritizedTask` the admission
//! engine schedules against (§3).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique job identifier — a 128-bit random UUID in string form
pub type JobId = String;

pub fn new_job_id() -> JobId {
    Uuid::new_v4().to_string()
}

/// Status DAG: `PENDING -> RUNNING -> {SUCCEEDED, FAILED}`. Once terminal,
/// never changes (§3 invariants).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Pending,
    Running,
    Succeeded,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Succeeded | JobStatus::Failed)
    }

    /// Whether transitioning from `self` to `next` is legal per the DAG
    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        matches!(
            (self, next),
            (JobStatus::Pending, JobStatus::Running)
                | (JobStatus::Running, JobStatus::Succeeded)
                | (JobStatus::Running, JobStatus::Failed)
        )
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobStatus::Pending => write!(f, "PENDING"),
            JobStatus::Running => write!(f, "RUNNING"),
            JobStatus::Succeeded => write!(f, "SUCCEEDED"),
            JobStatus::Failed => write!(f, "FAILED"),
        }
    }
}

/// The Durable Job Store record (§2, §6 schema)
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Job {
    pub id: JobId,
    pub status: String,
    pub result_html: Option<String>,
    pub urls_submitted: i32,
    pub urls_succeeded: i32,
    pub urls_failed: i32,
    pub user_id: Option<String>,
    pub execution_time_ms: Option<i64>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Job {
    pub fn status(&self) -> JobStatus {
        parse_status(&self.status)
    }

    pub fn new_pending(id: JobId, urls_submitted: i32, user_id: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id,
            status: JobStatus::Pending.to_string(),
            result_html: None,
            urls_submitted,
            urls_succeeded: 0,
            urls_failed: 0,
            user_id,
            execution_time_ms: None,
            started_at: None,
            completed_at: None,
            created_at: now,
            updated_at: now,
        }
    }
}

pub fn parse_status(raw: &str) -> JobStatus {
    match raw {
        "PENDING" => JobStatus::Pending,
        "RUNNING" => JobStatus::Running,
        "SUCCEEDED" => JobStatus::Succeeded,
        "FAILED" => JobStatus::Failed,
        other => {
            tracing::warn!(status = other, "unrecognized job status, defaulting to PENDING");
            JobStatus::Pending
        }
    }
}

/// Wire payload produced once at submit, consumed once by intake (§3)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskMessage {
    #[serde(rename = "jobId")]
    pub job_id: JobId,
    pub urls: Vec<String>,
    #[serde(rename = "userId")]
    pub user_id: Option<String>,
}

/// Submission-time validation (§6 `POST /api/v1/jobs`): the URL list must be
/// non-empty and every entry must parse as an absolute URL.
pub fn validate_urls(urls: &[String]) -> crate::Result<()> {
    if urls.is_empty() {
        return Err(crate::Error::invalid_input("urls must not be empty"));
    }

    for raw in urls {
        if url::Url::parse(raw).is_err() {
            return Err(crate::Error::invalid_input(format!("invalid url: {raw}")));
        }
    }

    Ok(())
}

/// Computed once at intake from URL count and historical averages (§4.2)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResourceEstimate {
    pub estimated_threads: i32,
    pub estimated_duration_ms: i64,
    pub resource_score: f64,
}

/// Lives in the APE pending set from intake until dispatch or removal (§3)
#[derive(Debug, Clone)]
pub struct PrioritizedTask {
    pub job_id: JobId,
    pub user_id: Option<String>,
    pub url_count: i32,
    pub estimate: ResourceEstimate,
    pub submit_time: DateTime<Utc>,
    pub priority_score: f64,
    pub can_execute: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_dag_forward_only() {
        assert!(JobStatus::Pending.can_transition_to(JobStatus::Running));
        assert!(JobStatus::Running.can_transition_to(JobStatus::Succeeded));
        assert!(JobStatus::Running.can_transition_to(JobStatus::Failed));
    }

    #[test]
    fn test_status_dag_forbids_backwards_and_leaving_terminal() {
        assert!(!JobStatus::Running.can_transition_to(JobStatus::Pending));
        assert!(!JobStatus::Succeeded.can_transition_to(JobStatus::Running));
        assert!(!JobStatus::Failed.can_transition_to(JobStatus::Pending));
        assert!(!JobStatus::Pending.can_transition_to(JobStatus::Succeeded));
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(JobStatus::Succeeded.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
        assert!(!JobStatus::Pending.is_terminal());
        assert!(!JobStatus::Running.is_terminal());
    }

    #[test]
    fn test_new_pending_job_defaults() {
        let job = Job::new_pending("abc".to_string(), 3, Some("u1".to_string()));
        assert_eq!(job.status(), JobStatus::Pending);
        assert_eq!(job.urls_submitted, 3);
        assert_eq!(job.urls_succeeded, 0);
        assert!(job.result_html.is_none());
    }

    #[test]
    fn test_unrecognized_status_defaults_to_pending() {
        assert_eq!(parse_status("BOGUS"), JobStatus::Pending);
    }

    #[test]
    fn test_validate_urls_rejects_empty_list() {
        assert!(validate_urls(&[]).is_err());
    }

    #[test]
    fn test_validate_urls_rejects_malformed_entry() {
        let urls = vec!["https://example.com".to_string(), "not a url".to_string()];
        assert!(validate_urls(&urls).is_err());
    }

    #[test]
    fn test_validate_urls_accepts_well_formed_list() {
        let urls = vec!["https://example.com/a".to_string(), "https://example.com/b".to_string()];
        assert!(validate_urls(&urls).is_ok());
    }
}
