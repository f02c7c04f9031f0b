//! Black-box integration tests against a running control-plane instance.
//!
//! These exercise the full submit -> status -> result HTTP flow. They
//! require a live server (Postgres + Redis wired up) and are opt-in:
//!
//!   TEST_SERVER_URL=http://127.0.0.1:8080 cargo test --test integration_test -- --ignored

use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::json;

pub struct TestHarness {
    base_url: String,
    http_client: Client,
}

impl TestHarness {
    pub async fn new() -> anyhow::Result<Self> {
        let _ = tracing_subscriber::fmt::try_init();

        let http_client = Client::builder().timeout(Duration::from_secs(30)).build()?;
        let base_url = std::env::var("TEST_SERVER_URL").unwrap_or_else(|_| "http://127.0.0.1:8080".to_string());

        Ok(Self { base_url, http_client })
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

#[derive(Debug, Deserialize)]
#[allow(dead_code)]
struct SubmitJobResponse {
    #[serde(rename = "jobId")]
    job_id: String,
}

#[derive(Debug, Serialize)]
#[allow(dead_code)]
struct JobStatusResponse {
    status: String,
}

#[tokio::test]
#[ignore]
async fn test_health_check() {
    let harness = TestHarness::new().await.expect("harness init");

    let response = harness
        .http_client
        .get(harness.url("/health"))
        .send()
        .await
        .expect("request failed");

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
#[ignore]
async fn test_submit_job_then_poll_status() {
    let harness = TestHarness::new().await.expect("harness init");

    let submit = harness
        .http_client
        .post(harness.url("/api/v1/jobs"))
        .json(&json!({ "urls": ["https://example.com"], "userId": "integration-test-user" }))
        .send()
        .await
        .expect("submit request failed");

    assert_eq!(submit.status(), StatusCode::OK);

    let body: SubmitJobResponse = submit.json().await.expect("decode submit response");
    assert!(!body.job_id.is_empty());

    let status = harness
        .http_client
        .get(harness.url(&format!("/api/v1/jobs/{}/status", body.job_id)))
        .send()
        .await
        .expect("status request failed");

    assert_eq!(status.status(), StatusCode::OK);
}

#[tokio::test]
#[ignore]
async fn test_submit_job_rejects_empty_url_list() {
    let harness = TestHarness::new().await.expect("harness init");

    let response = harness
        .http_client
        .post(harness.url("/api/v1/jobs"))
        .json(&json!({ "urls": [] }))
        .send()
        .await
        .expect("submit request failed");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
#[ignore]
async fn test_status_for_unknown_job_is_not_found() {
    let harness = TestHarness::new().await.expect("harness init");

    let response = harness
        .http_client
        .get(harness.url("/api/v1/jobs/does-not-exist/status"))
        .send()
        .await
        .expect("status request failed");

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
#[ignore]
async fn test_result_for_pending_job_is_rejected() {
    let harness = TestHarness::new().await.expect("harness init");

    let submit = harness
        .http_client
        .post(harness.url("/api/v1/jobs"))
        .json(&json!({ "urls": ["https://example.com/slow"] }))
        .send()
        .await
        .expect("submit request failed");

    let body: SubmitJobResponse = submit.json().await.expect("decode submit response");

    let result = harness
        .http_client
        .get(harness.url(&format!("/api/v1/jobs/{}/result", body.job_id)))
        .send()
        .await
        .expect("result request failed");

    assert_eq!(result.status(), StatusCode::BAD_REQUEST);
}
