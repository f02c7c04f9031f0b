//! REST surface (§6): submit, status, result.

use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use crawlctl_core::cache::transport::TransportMessage;
use crawlctl_core::jobs::job::validate_urls;
use crawlctl_core::{new_job_id, Job, JobStatus};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/jobs", post(submit_job))
        .route("/jobs/:job_id/status", get(get_status))
        .route("/jobs/:job_id/result", get(get_result))
}

#[derive(Debug, Deserialize)]
pub struct SubmitJobRequest {
    pub urls: Vec<String>,
    #[serde(rename = "userId")]
    pub user_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SubmitJobResponse {
    #[serde(rename = "jobId")]
    pub job_id: String,
}

async fn submit_job(
    State(state): State<AppState>,
    Json(request): Json<SubmitJobRequest>,
) -> ApiResult<(StatusCode, Json<SubmitJobResponse>)> {
    validate_urls(&request.urls)?;

    let job_id = new_job_id();
    let job = Job::new_pending(job_id.clone(), request.urls.len() as i32, request.user_id.clone());

    state.jobs.insert_pending(&job).await?;

    let message = TransportMessage {
        job_id: job_id.clone(),
        urls: request.urls,
        user_id: request.user_id,
    };

    if let Err(e) = state.transport.publish(&message).await {
        warn!(job_id, error = %e, "publish failed after DJS row was committed");
        return Err(crawlctl_core::Error::transport(e.to_string()).into());
    }

    info!(job_id, "job submitted");
    Ok((StatusCode::OK, Json(SubmitJobResponse { job_id })))
}

#[derive(Debug, Serialize)]
pub struct JobStatusResponse {
    #[serde(rename = "jobId")]
    pub job_id: String,
    pub status: JobStatus,
    #[serde(rename = "liveMessage")]
    pub live_message: Option<String>,
    #[serde(rename = "urlsSubmitted")]
    pub urls_submitted: i32,
    #[serde(rename = "urlsSucceeded")]
    pub urls_succeeded: i32,
    #[serde(rename = "urlsFailed")]
    pub urls_failed: i32,
}

async fn get_status(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> ApiResult<Json<JobStatusResponse>> {
    if let Some(live) = state.live_status.get(&job_id).await.map_err(crawlctl_core::Error::from)? {
        return Ok(Json(JobStatusResponse {
            job_id,
            status: live.status,
            live_message: Some(live.message),
            urls_submitted: live.urls_submitted,
            urls_succeeded: live.urls_succeeded,
            urls_failed: live.urls_failed,
        }));
    }

    let job = state
        .jobs
        .find_by_id(&job_id)
        .await?
        .ok_or_else(|| crawlctl_core::Error::job_not_found(job_id.clone()))?;

    Ok(Json(JobStatusResponse {
        job_id: job.id,
        status: job.status(),
        live_message: None,
        urls_submitted: job.urls_submitted,
        urls_succeeded: job.urls_succeeded,
        urls_failed: job.urls_failed,
    }))
}

async fn get_result(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> ApiResult<Response> {
    let job = state
        .jobs
        .find_by_id(&job_id)
        .await?
        .ok_or_else(|| crawlctl_core::Error::job_not_found(job_id.clone()))?;

    if job.status() != JobStatus::Succeeded {
        return Err(crawlctl_core::Error::job_not_completed(job_id).into());
    }

    let result_html = job
        .result_html
        .ok_or_else(|| crawlctl_core::Error::internal("SUCCEEDED job missing result_html"))?;

    Ok(([(header::CONTENT_TYPE, "text/html")], result_html).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_submit_request_accepts_camel_case_user_id() {
        let parsed: SubmitJobRequest =
            serde_json::from_str(r#"{"urls": ["https://example.com"], "userId": "u1"}"#).unwrap();
        assert_eq!(parsed.user_id.as_deref(), Some("u1"));
    }

    #[test]
    fn test_submit_request_user_id_is_optional() {
        let parsed: SubmitJobRequest = serde_json::from_str(r#"{"urls": ["https://example.com"]}"#).unwrap();
        assert!(parsed.user_id.is_none());
    }

    #[test]
    fn test_submit_response_serializes_job_id_camel_case() {
        let response = SubmitJobResponse { job_id: "abc".to_string() };
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["jobId"], "abc");
    }

    #[test]
    fn test_status_response_serializes_camel_case_fields() {
        let response = JobStatusResponse {
            job_id: "abc".to_string(),
            status: JobStatus::Running,
            live_message: Some("started".to_string()),
            urls_submitted: 3,
            urls_succeeded: 1,
            urls_failed: 0,
        };
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["liveMessage"], "started");
        assert_eq!(json["urlsSubmitted"], 3);
        assert_eq!(json["urlsSucceeded"], 1);
        assert_eq!(json["urlsFailed"], 0);
    }
}
