//! Asynchronous backend job polling
//!
//! Exports, Excel enrolment and wrong-note PDF generation run as backend jobs.
//! [`poll_job_until_done`] polls a status endpoint at a fixed interval until
//! the job reaches `DONE` or `FAILED`, or the attempt budget runs out. The loop
//! runs as a spawned task behind a [`JobHandle`] that can be awaited or aborted.

pub mod error;
pub mod tracker;

use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

use crate::http::{ApiClient, ApiError};

pub use error::JobError;
pub use tracker::{AsyncStatusStore, AsyncTask, TaskStatus};

/// Default delay between polls
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(1500);

/// Default attempt budget (3 minutes at the default interval)
pub const DEFAULT_MAX_ATTEMPTS: u32 = 120;

// ============================================================================
// Status model
// ============================================================================

/// Job status as reported by the backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobStatus {
    Pending,
    Running,
    Done,
    Failed,
    /// Any status this client does not know; treated as non-terminal
    Other(String),
}

impl JobStatus {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_uppercase().as_str() {
            "PENDING" | "QUEUED" => Self::Pending,
            "RUNNING" | "PROCESSING" => Self::Running,
            "DONE" | "SUCCESS" => Self::Done,
            "FAILED" => Self::Failed,
            _ => Self::Other(raw.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Pending => "PENDING",
            Self::Running => "RUNNING",
            Self::Done => "DONE",
            Self::Failed => "FAILED",
            Self::Other(raw) => raw,
        }
    }

    /// `DONE` or `FAILED`
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }
}

impl Serialize for JobStatus {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for JobStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::parse(&raw))
    }
}

/// Worker progress
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobProgress {
    #[serde(default)]
    pub step: Option<String>,
    #[serde(default)]
    pub percent: Option<f64>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ProgressRepr {
    Percent(f64),
    Detailed(JobProgress),
}

fn deserialize_progress<'de, D>(deserializer: D) -> Result<Option<JobProgress>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(
        Option::<ProgressRepr>::deserialize(deserializer)?.map(|repr| match repr {
            ProgressRepr::Percent(percent) => JobProgress {
                step: None,
                percent: Some(percent),
            },
            ProgressRepr::Detailed(progress) => progress,
        }),
    )
}

fn deserialize_job_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        Value::Null => Ok(String::new()),
        other => Err(serde::de::Error::custom(format!(
            "job_id must be a string or number, got {other}"
        ))),
    }
}

/// One status response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobSnapshot {
    #[serde(default, deserialize_with = "deserialize_job_id")]
    pub job_id: String,
    pub status: JobStatus,
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default, deserialize_with = "deserialize_progress")]
    pub progress: Option<JobProgress>,
    #[serde(default)]
    pub error_message: Option<String>,
}

impl JobSnapshot {
    /// Progress percentage if the worker reported one
    pub fn percent(&self) -> Option<f64> {
        self.progress.as_ref().and_then(|p| p.percent)
    }
}

// ============================================================================
// Status sources
// ============================================================================

/// Anything that can report a job's status
#[async_trait]
pub trait JobStatusSource: Send + Sync {
    async fn fetch_status(&self, job_id: &str) -> Result<JobSnapshot, ApiError>;
}

/// Status endpoint families
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobEndpoint {
    /// `/jobs/{id}/`
    Generic,
    /// `/enrollments/excel_job_status/{id}/`
    ExcelEnroll,
    /// `/results/wrong-notes/pdf/{id}/`
    WrongNotePdf,
}

impl JobEndpoint {
    /// Status path for a job id
    pub fn path(&self, job_id: &str) -> String {
        let id = encode_segment(job_id);
        match self {
            Self::Generic => format!("/jobs/{id}/"),
            Self::ExcelEnroll => format!("/enrollments/excel_job_status/{id}/"),
            Self::WrongNotePdf => format!("/results/wrong-notes/pdf/{id}/"),
        }
    }

    /// Job type label used by the status tracker
    pub fn job_type(&self) -> &'static str {
        match self {
            Self::Generic => "job",
            Self::ExcelEnroll => "excel_parsing",
            Self::WrongNotePdf => "wrong_note_pdf",
        }
    }
}

/// Percent-encode a path segment (RFC 3986 unreserved characters kept)
fn encode_segment(raw: &str) -> String {
    raw.bytes()
        .map(|b| match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                (b as char).to_string()
            }
            _ => format!("%{b:02X}"),
        })
        .collect()
}

/// [`JobStatusSource`] backed by the REST client
#[derive(Debug, Clone)]
pub struct ApiJobSource {
    client: ApiClient,
    endpoint: JobEndpoint,
}

impl ApiJobSource {
    pub fn new(client: ApiClient, endpoint: JobEndpoint) -> Self {
        Self { client, endpoint }
    }
}

#[async_trait]
impl JobStatusSource for ApiJobSource {
    async fn fetch_status(&self, job_id: &str) -> Result<JobSnapshot, ApiError> {
        self.client.get(&self.endpoint.path(job_id)).await
    }
}

// ============================================================================
// Poll loop
// ============================================================================

/// Fixed-interval polling budget
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

impl PollPolicy {
    pub fn new(interval: Duration, max_attempts: u32) -> Self {
        Self {
            interval,
            max_attempts,
        }
    }

    /// Longest time the poller can run
    pub fn ceiling(&self) -> Duration {
        self.interval * self.max_attempts.saturating_sub(1)
    }
}

/// Poll until a terminal status, in the current task
///
/// The first poll is immediate; later polls are `policy.interval` apart.
/// `on_snapshot` sees every response, terminal ones included.
pub async fn poll_until_done<S, F>(
    source: &S,
    job_id: &str,
    policy: &PollPolicy,
    mut on_snapshot: F,
) -> Result<JobSnapshot, JobError>
where
    S: JobStatusSource + ?Sized,
    F: FnMut(&JobSnapshot),
{
    for attempt in 1..=policy.max_attempts {
        if attempt > 1 {
            tokio::time::sleep(policy.interval).await;
        }

        let snapshot = source.fetch_status(job_id).await?;
        tracing::debug!(
            job_id,
            attempt,
            status = snapshot.status.as_str(),
            "Polled job status"
        );
        on_snapshot(&snapshot);

        match snapshot.status {
            JobStatus::Done => return Ok(snapshot),
            JobStatus::Failed => {
                return Err(JobError::failed(snapshot.error_message.as_deref()));
            }
            _ => {}
        }
    }

    tracing::warn!(job_id, attempts = policy.max_attempts, "Job polling budget exhausted");
    Err(JobError::Timeout {
        attempts: policy.max_attempts,
    })
}

/// Spawn a poller with the default policy
pub fn poll_job_until_done(source: Arc<dyn JobStatusSource>, job_id: impl Into<String>) -> JobHandle {
    poll_job_with_policy(source, job_id, PollPolicy::default())
}

/// Spawn a poller with an explicit policy
pub fn poll_job_with_policy(
    source: Arc<dyn JobStatusSource>,
    job_id: impl Into<String>,
    policy: PollPolicy,
) -> JobHandle {
    let job_id = job_id.into();
    let task = tokio::spawn(async move {
        poll_until_done(source.as_ref(), &job_id, &policy, |_| {}).await
    });
    JobHandle::new(task)
}

/// Spawn a poller that mirrors progress into the status tracker
///
/// A pending task labelled `label` is registered under the job id, updated on
/// each snapshot that carries a percentage, and completed when polling ends.
pub fn poll_job_tracked(
    source: Arc<dyn JobStatusSource>,
    job_id: impl Into<String>,
    policy: PollPolicy,
    tracker: AsyncStatusStore,
    label: &str,
    job_type: &str,
) -> JobHandle {
    let job_id = job_id.into();
    let task_id = tracker.add_task(label, Some(&job_id));
    tracker.attach_worker_meta(&task_id, &job_id, job_type);

    let task = tokio::spawn(async move {
        let result = poll_until_done(source.as_ref(), &job_id, &policy, |snapshot| {
            if let Some(percent) = snapshot.percent() {
                tracker.update_progress(&task_id, percent);
            }
        })
        .await;

        match &result {
            Ok(_) => tracker.complete_task(&task_id, TaskStatus::Success, None),
            Err(e) => tracker.complete_task(&task_id, TaskStatus::Error, Some(&e.korean_desc())),
        }
        result
    });
    JobHandle::new(task)
}

/// Handle to a spawned poller
///
/// Dropping the handle stops the poller.
#[derive(Debug)]
pub struct JobHandle {
    task: Option<JoinHandle<Result<JobSnapshot, JobError>>>,
}

impl JobHandle {
    fn new(task: JoinHandle<Result<JobSnapshot, JobError>>) -> Self {
        Self { task: Some(task) }
    }

    /// Stop polling; a pending [`result`](Self::result) yields `Cancelled`
    pub fn abort(&self) {
        if let Some(task) = &self.task {
            task.abort();
        }
    }

    /// True once the poller has stopped for any reason
    pub fn is_finished(&self) -> bool {
        self.task.as_ref().map_or(true, JoinHandle::is_finished)
    }

    /// Wait for the terminal result
    pub async fn result(mut self) -> Result<JobSnapshot, JobError> {
        let Some(task) = self.task.take() else {
            return Err(JobError::Cancelled);
        };
        match task.await {
            Ok(result) => result,
            Err(e) if e.is_cancelled() => Err(JobError::Cancelled),
            Err(e) => Err(JobError::Panicked(e.to_string())),
        }
    }
}

impl Drop for JobHandle {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
