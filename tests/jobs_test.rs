//! Job polling against a mock status endpoint

mod common;

use common::{api, mock_client};
use async_trait::async_trait;
use hakwonplus::http::ApiError;
use hakwonplus::jobs::{
    poll_job_tracked, poll_job_until_done, poll_job_with_policy, AsyncStatusStore, JobEndpoint,
    JobError, JobSnapshot, JobStatus, JobStatusSource, PollPolicy, TaskStatus,
};
use serde_json::json;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn fast_policy(max_attempts: u32) -> PollPolicy {
    PollPolicy::new(Duration::from_millis(10), max_attempts)
}

/// Replays a fixed status sequence, repeating the last entry
struct ScriptedSource {
    script: Vec<JobStatus>,
    calls: Mutex<Vec<Instant>>,
}

impl ScriptedSource {
    fn new(script: Vec<JobStatus>) -> Arc<Self> {
        Arc::new(Self {
            script,
            calls: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> Vec<Instant> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl JobStatusSource for ScriptedSource {
    async fn fetch_status(&self, job_id: &str) -> Result<JobSnapshot, ApiError> {
        let mut calls = self.calls.lock().unwrap();
        calls.push(Instant::now());
        let index = (calls.len() - 1).min(self.script.len() - 1);
        Ok(JobSnapshot {
            job_id: job_id.to_string(),
            status: self.script[index].clone(),
            result: None,
            progress: None,
            error_message: None,
        })
    }
}

async fn mount_sequence(server: &MockServer, route: &str, bodies: &[serde_json::Value]) {
    let (last, head) = bodies.split_last().unwrap();
    for body in head {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .up_to_n_times(1)
            .mount(server)
            .await;
    }
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_json(last))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_poll_until_done() {
    let server = MockServer::start().await;
    let (client, _store) = mock_client(&server);

    mount_sequence(
        &server,
        &api("/jobs/abc-1/"),
        &[
            json!({"job_id": "abc-1", "status": "PENDING"}),
            json!({"job_id": "abc-1", "status": "RUNNING", "progress": 40}),
            json!({"job_id": "abc-1", "status": "DONE", "result": {"rows": 12}}),
        ],
    )
    .await;

    let source = client.jobs().source(JobEndpoint::Generic);
    let snapshot = poll_job_with_policy(source, "abc-1", fast_policy(10))
        .result()
        .await
        .unwrap();

    assert_eq!(snapshot.status, JobStatus::Done);
    assert_eq!(snapshot.result, Some(json!({"rows": 12})));
    assert_eq!(server.received_requests().await.unwrap().len(), 3);
}

#[tokio::test]
async fn test_failed_job_carries_server_message() {
    let server = MockServer::start().await;
    let (client, _store) = mock_client(&server);

    mount_sequence(
        &server,
        &api("/enrollments/excel_job_status/77/"),
        &[json!({"job_id": 77, "status": "FAILED", "error_message": "엑셀 형식 오류"})],
    )
    .await;

    let source = client.jobs().source(JobEndpoint::ExcelEnroll);
    let err = poll_job_with_policy(source, "77", fast_policy(10))
        .result()
        .await
        .unwrap_err();
    assert!(matches!(err, JobError::Failed(ref m) if m == "엑셀 형식 오류"), "got {err:?}");
}

#[tokio::test]
async fn test_attempt_budget() {
    let server = MockServer::start().await;
    let (client, _store) = mock_client(&server);

    mount_sequence(
        &server,
        &api("/jobs/slow/"),
        &[json!({"job_id": "slow", "status": "RUNNING"})],
    )
    .await;

    let source = client.jobs().source(JobEndpoint::Generic);
    let err = poll_job_with_policy(source, "slow", fast_policy(3))
        .result()
        .await
        .unwrap_err();
    assert!(matches!(err, JobError::Timeout { attempts: 3 }));
    assert_eq!(server.received_requests().await.unwrap().len(), 3);
}

/// Transport errors stop polling at once
#[tokio::test]
async fn test_status_error_propagates() {
    let server = MockServer::start().await;
    let (client, _store) = mock_client(&server);

    Mock::given(method("GET"))
        .and(path(api("/jobs/gone/")))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let source = client.jobs().source(JobEndpoint::Generic);
    let err = poll_job_with_policy(source, "gone", fast_policy(5))
        .result()
        .await
        .unwrap_err();
    assert!(matches!(err, JobError::Api(_)));
    assert_eq!(server.received_requests().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_tracked_job_updates_store() {
    let server = MockServer::start().await;
    let (client, _store) = mock_client(&server);

    mount_sequence(
        &server,
        &api("/results/wrong-notes/pdf/pdf-9/"),
        &[
            json!({"job_id": "pdf-9", "status": "RUNNING", "progress": {"step": "render", "percent": 50}}),
            json!({"job_id": "pdf-9", "status": "DONE"}),
        ],
    )
    .await;

    let tracker = AsyncStatusStore::new();
    let endpoint = JobEndpoint::WrongNotePdf;
    poll_job_tracked(
        client.jobs().source(endpoint),
        "pdf-9",
        fast_policy(10),
        tracker.clone(),
        "오답노트 PDF",
        endpoint.job_type(),
    )
    .result()
    .await
    .unwrap();

    let tasks = tracker.snapshot();
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].status, TaskStatus::Success);
    assert_eq!(tasks[0].label, "오답노트 PDF");
    assert_eq!(
        tasks[0].worker.as_ref().map(|w| w.job_type.as_str()),
        Some("wrong_note_pdf")
    );
}

/// Dropping or aborting the handle cancels the poller
#[tokio::test]
async fn test_abort() {
    let server = MockServer::start().await;
    let (client, _store) = mock_client(&server);

    mount_sequence(
        &server,
        &api("/jobs/forever/"),
        &[json!({"job_id": "forever", "status": "RUNNING"})],
    )
    .await;

    let handle = poll_job_with_policy(
        client.jobs().source(JobEndpoint::Generic),
        "forever",
        PollPolicy::new(Duration::from_secs(60), 100),
    );
    handle.abort();
    assert!(matches!(handle.result().await, Err(JobError::Cancelled)));
}

#[tokio::test(start_paused = true)]
async fn test_default_policy_spacing() {
    let source = ScriptedSource::new(vec![JobStatus::Pending, JobStatus::Pending, JobStatus::Done]);

    let snapshot = poll_job_until_done(source.clone(), "job-1")
        .result()
        .await
        .unwrap();
    assert_eq!(snapshot.status, JobStatus::Done);

    let calls = source.calls();
    assert_eq!(calls.len(), 3);
    for pair in calls.windows(2) {
        assert!(pair[1] - pair[0] >= Duration::from_millis(1500));
    }
}

#[tokio::test(start_paused = true)]
async fn test_default_budget_is_120_polls() {
    let source = ScriptedSource::new(vec![JobStatus::Pending]);

    let err = poll_job_until_done(source.clone(), "job-2")
        .result()
        .await
        .unwrap_err();
    assert!(matches!(err, JobError::Timeout { attempts: 120 }), "got {err:?}");

    let calls = source.calls();
    assert_eq!(calls.len(), 120);
    assert!(calls[119] - calls[0] >= Duration::from_millis(1500) * 119);
}
