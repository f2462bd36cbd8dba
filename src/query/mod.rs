//! Data-fetching hooks
//!
//! Each hook pairs a [`QueryKey`] with one feature API call and serves it
//! through the shared [`QueryCache`]. Errors are returned as-is; nothing is
//! retried.
//!
//! Polling hooks spawn a task that refetches at a fixed interval and publishes
//! [`QueryState`] through a `tokio::sync::watch` channel until the data reaches
//! a terminal state or the [`PollHandle`] is stopped.
//!
//! ```rust,ignore
//! let queries = QueryClient::new(client);
//! let result = queries.use_my_exam_result(42).await?;
//!
//! let mut watch = queries.watch_submission_status(17);
//! while watch.changed().await {
//!     println!("{:?}", watch.current());
//! }
//! ```

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::api::attendance::{AttendanceRecord, AttendanceUpdate};
use crate::api::exams::{AdminExamResultRow, Exam, ExamType, StudentExamResult};
use crate::api::messages::MessagingInfo;
use crate::api::submissions::SubmissionStatus;
use crate::api::videos::Video;
use crate::api::Id;
use crate::cache::{QueryCache, QueryKey};
use crate::error::{Error, Result};
use crate::http::ApiClient;
use crate::jobs::{JobEndpoint, JobSnapshot};
use crate::tenant::{Program, ProgramService};

/// Stale time used when a hook does not set one
pub const DEFAULT_STALE_TIME: Duration = Duration::from_secs(30);

/// Submission status refetch interval
pub const SUBMISSION_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Job status refetch interval
pub const JOB_POLL_INTERVAL: Duration = Duration::from_millis(1500);

/// Result of a query as seen by a view
#[derive(Debug, Clone)]
pub enum QueryState<T> {
    Loading,
    Success(T),
    Error(Arc<Error>),
}

impl<T> QueryState<T> {
    pub fn from_result(result: Result<T>) -> Self {
        match result {
            Ok(data) => Self::Success(data),
            Err(e) => Self::Error(Arc::new(e)),
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }

    pub fn data(&self) -> Option<&T> {
        match self {
            Self::Success(data) => Some(data),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&Error> {
        match self {
            Self::Error(e) => Some(e),
            _ => None,
        }
    }
}

// ============================================================================
// Polling
// ============================================================================

/// Live view of a polling query
///
/// Dropping the handle stops the poller.
pub struct PollHandle<T> {
    rx: watch::Receiver<QueryState<T>>,
    task: Option<JoinHandle<()>>,
}

impl<T: Clone> PollHandle<T> {
    pub fn current(&self) -> QueryState<T> {
        self.rx.borrow().clone()
    }

    /// Wait for the next published state; `false` once the poller has ended
    pub async fn changed(&mut self) -> bool {
        self.rx.changed().await.is_ok()
    }

    pub fn subscribe(&self) -> watch::Receiver<QueryState<T>> {
        self.rx.clone()
    }

    /// Wait until polling ends and return the last state
    ///
    /// A poller that panicked is logged and leaves its last published state.
    pub async fn settled(mut self) -> QueryState<T> {
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                if e.is_panic() {
                    tracing::warn!(error = %e, "Query poller panicked");
                } else {
                    tracing::debug!("Query poller cancelled");
                }
            }
        }
        self.rx.borrow().clone()
    }
}

impl<T> PollHandle<T> {
    pub fn stop(&self) {
        if let Some(task) = &self.task {
            task.abort();
        }
    }

    pub fn is_finished(&self) -> bool {
        self.task.as_ref().map_or(true, JoinHandle::is_finished)
    }
}

impl<T> Drop for PollHandle<T> {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

// ============================================================================
// Client
// ============================================================================

/// Owns the REST client and the query cache
#[derive(Debug, Clone)]
pub struct QueryClient {
    client: ApiClient,
    cache: QueryCache,
    stale_time: Duration,
}

impl QueryClient {
    pub fn new(client: ApiClient) -> Self {
        Self::with_cache(client, QueryCache::new())
    }

    pub fn with_cache(client: ApiClient, cache: QueryCache) -> Self {
        Self {
            client,
            cache,
            stale_time: DEFAULT_STALE_TIME,
        }
    }

    pub fn with_stale_time(mut self, stale_time: Duration) -> Self {
        self.stale_time = stale_time;
        self
    }

    pub fn api(&self) -> &ApiClient {
        &self.client
    }

    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }

    /// Serve `key` from cache or run `fetcher` once
    pub async fn fetch_query<T, F, Fut>(&self, key: &QueryKey, fetcher: F) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        self.cache.fetch_with(key, self.stale_time, fetcher).await
    }

    /// Refetch `key` every `interval` until `stop_when` holds
    ///
    /// The first fetch runs immediately. A failed fetch publishes
    /// [`QueryState::Error`] and polling continues on the next tick.
    pub fn watch_query<T, F, Fut, S>(
        &self,
        key: QueryKey,
        interval: Duration,
        fetcher: F,
        stop_when: S,
    ) -> PollHandle<T>
    where
        T: Serialize + Clone + Send + Sync + 'static,
        F: Fn(ApiClient) -> Fut + Send + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
        S: Fn(&T) -> bool + Send + 'static,
    {
        let (tx, rx) = watch::channel(QueryState::Loading);
        let client = self.client.clone();
        let cache = self.cache.clone();

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                tracing::debug!(key = %key, "Polling query");
                let fetch = fetcher(client.clone());
                match fetch.await {
                    Ok(data) => {
                        if let Err(e) = cache.set(&key, &data) {
                            tracing::warn!(key = %key, error = %e, "Failed to cache polled result");
                        }
                        let done = stop_when(&data);
                        if tx.send(QueryState::Success(data)).is_err() || done {
                            break;
                        }
                    }
                    Err(e) => {
                        tracing::warn!(key = %key, error = %e, "Polled query failed");
                        if tx.send(QueryState::Error(Arc::new(e))).is_err() {
                            break;
                        }
                    }
                }
            }
            tracing::debug!(key = %key, "Polling stopped");
        });

        PollHandle {
            rx,
            task: Some(task),
        }
    }

    // ========================================================================
    // Hooks
    // ========================================================================

    pub async fn use_my_exam_result(&self, exam_id: Id) -> Result<StudentExamResult> {
        let key = QueryKey::new("my-exam-result").with(exam_id);
        self.fetch_query(&key, || async move { self.client.exams().my_result(exam_id).await })
            .await
    }

    pub async fn use_admin_exam_results(&self, exam_id: Id) -> Result<Vec<AdminExamResultRow>> {
        let key = QueryKey::new("admin-exam-results").with(exam_id);
        self.fetch_query(&key, || async move { self.client.exams().results(exam_id).await })
            .await
    }

    pub async fn use_exams(&self, exam_type: Option<ExamType>) -> Result<Vec<Exam>> {
        let segment = match exam_type {
            Some(ExamType::Template) => "template",
            Some(ExamType::Regular) => "regular",
            None => "all",
        };
        let key = QueryKey::new("exams").with(segment);
        self.fetch_query(&key, || async move { self.client.exams().list(exam_type).await })
            .await
    }

    pub async fn use_session_videos(&self, session_id: Id) -> Result<Vec<Video>> {
        let key = QueryKey::new("session-videos").with(session_id);
        self.fetch_query(&key, || async move { self.client.videos().list(session_id).await })
            .await
    }

    pub async fn use_attendance(&self, session_id: Id) -> Result<Vec<AttendanceRecord>> {
        let key = attendance_key(session_id);
        self.fetch_query(&key, || async move { self.client.attendance().list(session_id).await })
            .await
    }

    pub async fn use_messaging_info(&self) -> Result<MessagingInfo> {
        let key = QueryKey::new("messaging").with("info");
        self.fetch_query(&key, || async move { self.client.messages().info().await })
            .await
    }

    /// Program as a query state; the service keeps its own single copy
    pub async fn use_program(&self, program: &ProgramService) -> QueryState<Arc<Program>> {
        QueryState::from_result(program.load().await)
    }

    /// Poll a submission every 2 s until it reaches a terminal status
    pub fn watch_submission_status(&self, submission_id: Id) -> PollHandle<SubmissionStatus> {
        self.watch_query(
            QueryKey::new("submission-status").with(submission_id),
            SUBMISSION_POLL_INTERVAL,
            move |client| async move { client.submissions().status(submission_id).await },
            SubmissionStatus::is_terminal,
        )
    }

    /// Poll a job every 1.5 s until `DONE` or `FAILED`
    pub fn watch_job(&self, endpoint: JobEndpoint, job_id: &str) -> PollHandle<JobSnapshot> {
        let id = job_id.to_string();
        self.watch_query(
            QueryKey::new("job").with(endpoint.job_type()).with(job_id),
            JOB_POLL_INTERVAL,
            move |client| {
                let id = id.clone();
                async move { client.jobs().status(endpoint, &id).await }
            },
            |snapshot| snapshot.status.is_terminal(),
        )
    }

    // ========================================================================
    // Mutations
    // ========================================================================

    /// Update one attendance record and invalidate the session's list
    pub async fn update_attendance(
        &self,
        session_id: Id,
        attendance_id: Id,
        update: &AttendanceUpdate,
    ) -> Result<AttendanceRecord> {
        let record = self.client.attendance().update(attendance_id, update).await?;
        self.cache.invalidate(&attendance_key(session_id));
        self.cache.invalidate_prefix(&QueryKey::new("attendance-matrix"));
        Ok(record)
    }

    /// Drop every cached query
    pub fn clear(&self) {
        self.cache.clear();
    }
}

fn attendance_key(session_id: Id) -> QueryKey {
    QueryKey::new("attendance").with(session_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    fn offline_client() -> QueryClient {
        let api = ApiClient::with_base_url("http://127.0.0.1:9", MemoryStore::shared()).unwrap();
        QueryClient::new(api)
    }

    #[tokio::test(start_paused = true)]
    async fn test_settled_after_poller_panic_keeps_last_state() {
        let queries = offline_client();
        let counter = Arc::new(std::sync::atomic::AtomicU32::new(0));
        let seen = Arc::clone(&counter);

        let handle = queries.watch_query(
            QueryKey::new("flaky"),
            Duration::from_secs(2),
            move |_client| {
                let seen = Arc::clone(&seen);
                async move {
                    let n = seen.fetch_add(1, std::sync::atomic::Ordering::SeqCst) + 1;
                    if n > 1 {
                        panic!("status decoder blew up");
                    }
                    Ok(n)
                }
            },
            |_: &u32| false,
        );

        let last = handle.settled().await;
        assert_eq!(last.data(), Some(&1));
        assert_eq!(counter.load(std::sync::atomic::Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_watch_query_stops_on_terminal_data() {
        let queries = offline_client();
        let counter = Arc::new(std::sync::atomic::AtomicU32::new(0));
        let seen = Arc::clone(&counter);

        let handle = queries.watch_query(
            QueryKey::new("count"),
            Duration::from_secs(2),
            move |_client| {
                let seen = Arc::clone(&seen);
                async move { Ok(seen.fetch_add(1, std::sync::atomic::Ordering::SeqCst) + 1) }
            },
            |n: &u32| *n >= 3,
        );

        let last = handle.settled().await;
        assert_eq!(last.data(), Some(&3));
        assert_eq!(counter.load(std::sync::atomic::Ordering::SeqCst), 3);
        assert_eq!(
            queries.cache().get_data::<u32>(&QueryKey::new("count")),
            Some(3)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_ends_polling() {
        let queries = offline_client();
        let mut handle = queries.watch_query(
            QueryKey::new("never"),
            Duration::from_secs(1),
            |_client| async { Ok(0u32) },
            |_| false,
        );
        assert!(handle.changed().await);
        handle.stop();
        assert!(!handle.changed().await);
    }

    #[test]
    fn test_query_state_accessors() {
        let state: QueryState<u32> = QueryState::from_result(Err(Error::other("x")));
        assert!(state.error().is_some());
        assert!(state.data().is_none());
        assert!(QueryState::<u32>::Loading.is_loading());
    }
}
