//! Direct-to-storage upload through pre-signed URLs
//!
//! [`upload_to_r2`] issues one PUT against a pre-signed R2 URL, streaming the
//! body in chunks and reporting whole-number percentages as it goes. The
//! upload runs as a spawned task behind an [`UploadHandle`].

pub mod error;

use bytes::Bytes;
use futures::{stream, StreamExt};
use reqwest::header::{HeaderValue, CONTENT_LENGTH, CONTENT_TYPE};
use reqwest::{Body, Client};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

use crate::api::videos::UploadInitRequest;
use crate::error::{ClientErrorTrait, Error, Result};
use crate::http::ApiClient;
use crate::jobs::{AsyncStatusStore, TaskStatus};

pub use error::UploadError;

/// Whole upload must finish within this
pub const DEFAULT_UPLOAD_TIMEOUT: Duration = Duration::from_secs(60);

/// Streaming chunk size
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// Progress callback, receives 1..=100
pub type ProgressFn = Arc<dyn Fn(u8) + Send + Sync>;

/// Upload tuning
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadOptions {
    pub chunk_size: usize,
    pub timeout: Duration,
}

impl Default for UploadOptions {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            timeout: DEFAULT_UPLOAD_TIMEOUT,
        }
    }
}

impl UploadOptions {
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Reports each rounded percentage at most once, in increasing order
struct ProgressReporter {
    total: u64,
    last: AtomicU8,
    callback: Option<ProgressFn>,
}

impl ProgressReporter {
    fn new(total: u64, callback: Option<ProgressFn>) -> Self {
        Self {
            total,
            last: AtomicU8::new(0),
            callback,
        }
    }

    fn sent(&self, bytes_sent: u64) {
        if self.total == 0 {
            return;
        }
        let percent = ((bytes_sent as f64 / self.total as f64) * 100.0).round().min(100.0) as u8;
        self.report(percent);
    }

    fn finish(&self) {
        self.report(100);
    }

    fn report(&self, percent: u8) {
        let previous = self.last.fetch_max(percent, Ordering::SeqCst);
        if percent > previous {
            if let Some(callback) = &self.callback {
                callback(percent);
            }
        }
    }
}

/// PUT client for pre-signed URLs
///
/// Carries no tenant, bearer or cookie state; the URL signature is the credential.
#[derive(Debug, Clone)]
pub struct R2Uploader {
    http: Client,
    options: UploadOptions,
}

impl R2Uploader {
    pub fn new() -> std::result::Result<Self, UploadError> {
        Self::with_options(UploadOptions::default())
    }

    pub fn with_options(options: UploadOptions) -> std::result::Result<Self, UploadError> {
        let http = Client::builder()
            .timeout(options.timeout)
            .build()
            .map_err(|e| UploadError::Network(e.to_string()))?;
        Ok(Self { http, options })
    }

    pub fn options(&self) -> UploadOptions {
        self.options
    }

    /// Start an upload
    pub fn upload(
        &self,
        url: &str,
        body: Bytes,
        content_type: Option<&str>,
        on_progress: Option<ProgressFn>,
    ) -> UploadHandle {
        let http = self.http.clone();
        let options = self.options;
        let url = url.to_string();
        let content_type = content_type.map(str::to_string);

        UploadHandle::new(tokio::spawn(async move {
            put_object(&http, &url, body, content_type.as_deref(), on_progress, options).await
        }))
    }
}

/// Upload `body` to a pre-signed URL with default options
///
/// When `content_type` is given it must match the one the URL was signed with.
/// A value that is not a valid header is skipped with a warning.
pub fn upload_to_r2(
    url: &str,
    body: Bytes,
    content_type: Option<&str>,
    on_progress: Option<ProgressFn>,
) -> UploadHandle {
    match R2Uploader::new() {
        Ok(uploader) => uploader.upload(url, body, content_type, on_progress),
        Err(e) => UploadHandle::new(tokio::spawn(async move { Err(e) })),
    }
}

/// Split the body into streaming chunks; a zero size counts as one byte
fn split_chunks(body: &Bytes, chunk_size: usize) -> Vec<Bytes> {
    let chunk_size = chunk_size.max(1);
    (0..body.len())
        .step_by(chunk_size)
        .map(|start| body.slice(start..(start + chunk_size).min(body.len())))
        .collect()
}

async fn put_object(
    http: &Client,
    url: &str,
    body: Bytes,
    content_type: Option<&str>,
    on_progress: Option<ProgressFn>,
    options: UploadOptions,
) -> std::result::Result<(), UploadError> {
    let total = body.len() as u64;
    let reporter = Arc::new(ProgressReporter::new(total, on_progress));

    let chunks = split_chunks(&body, options.chunk_size);

    let stream_reporter = Arc::clone(&reporter);
    let mut sent = 0u64;
    let body_stream = stream::iter(chunks).map(move |chunk| {
        sent += chunk.len() as u64;
        stream_reporter.sent(sent);
        Ok::<Bytes, std::io::Error>(chunk)
    });

    let mut request = http
        .put(url)
        .timeout(options.timeout)
        .header(CONTENT_LENGTH, total)
        .body(Body::wrap_stream(body_stream));

    if let Some(content_type) = content_type {
        match HeaderValue::from_str(content_type) {
            Ok(value) => request = request.header(CONTENT_TYPE, value),
            Err(e) => {
                tracing::warn!(content_type, error = %e, "Skipping invalid Content-Type header");
            }
        }
    }

    let response = request.send().await.map_err(UploadError::from_reqwest)?;
    let status = response.status();
    if !status.is_success() {
        tracing::warn!(status = status.as_u16(), "Pre-signed upload rejected");
        return Err(UploadError::Status {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
        });
    }

    reporter.finish();
    tracing::debug!(bytes = total, "Pre-signed upload finished");
    Ok(())
}

/// Handle to a spawned upload
///
/// Dropping the handle aborts the upload.
#[derive(Debug)]
pub struct UploadHandle {
    task: Option<JoinHandle<std::result::Result<(), UploadError>>>,
}

impl UploadHandle {
    fn new(task: JoinHandle<std::result::Result<(), UploadError>>) -> Self {
        Self { task: Some(task) }
    }

    /// Stop the upload; a pending [`result`](Self::result) yields `Aborted`
    pub fn abort(&self) {
        if let Some(task) = &self.task {
            task.abort();
        }
    }

    pub fn is_finished(&self) -> bool {
        self.task.as_ref().map_or(true, JoinHandle::is_finished)
    }

    /// Wait for the upload to finish
    pub async fn result(mut self) -> std::result::Result<(), UploadError> {
        let Some(task) = self.task.take() else {
            return Err(UploadError::Aborted);
        };
        match task.await {
            Ok(result) => result,
            Err(e) if e.is_cancelled() => Err(UploadError::Aborted),
            Err(e) => Err(UploadError::Network(format!("upload task failed: {e}"))),
        }
    }
}

impl Drop for UploadHandle {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

// ============================================================================
// Video upload flow
// ============================================================================

/// Content type assumed when the file has none
pub const DEFAULT_VIDEO_CONTENT_TYPE: &str = "video/mp4";

/// Job type the backend uses for transcoding
pub const VIDEO_PROCESSING_JOB: &str = "video_processing";

/// Inputs of [`upload_video`]
#[derive(Debug, Clone)]
pub struct VideoUploadParams {
    pub session_id: u64,
    pub file_name: String,
    pub body: Bytes,
    pub content_type: Option<String>,
    pub title: String,
    pub description: Option<String>,
    pub show_watermark: bool,
    pub allow_skip: bool,
    pub max_speed: f64,
}

/// Register, upload and finalize a lecture video
///
/// Progress is published to `tracker` under a task labelled "영상 추가"; after
/// the upload completes the task is handed to the `video_processing` worker.
/// Returns the new video id.
pub async fn upload_video(
    client: &ApiClient,
    uploader: &R2Uploader,
    params: VideoUploadParams,
    tracker: &AsyncStatusStore,
) -> Result<u64> {
    let task_id = format!(
        "video-upload-{}-{}",
        params.session_id,
        chrono::Utc::now().timestamp_millis()
    );
    tracker.add_task("영상 추가", Some(&task_id));

    match run_video_upload(client, uploader, params, tracker, &task_id).await {
        Ok(video_id) => {
            tracker.attach_worker_meta(&task_id, &video_id.to_string(), VIDEO_PROCESSING_JOB);
            tracing::info!(video_id, "Video uploaded, waiting for processing");
            Ok(video_id)
        }
        Err(e) => {
            tracker.complete_task(&task_id, TaskStatus::Error, Some(&upload_failure_message(&e)));
            Err(e)
        }
    }
}

async fn run_video_upload(
    client: &ApiClient,
    uploader: &R2Uploader,
    params: VideoUploadParams,
    tracker: &AsyncStatusStore,
    task_id: &str,
) -> Result<u64> {
    let content_type = params
        .content_type
        .clone()
        .filter(|c| !c.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_VIDEO_CONTENT_TYPE.to_string());

    let request = UploadInitRequest {
        session: params.session_id,
        title: params.title.trim().to_string(),
        filename: params.file_name.clone(),
        content_type,
        description: params
            .description
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .map(str::to_string),
        allow_skip: Some(params.allow_skip),
        max_speed: Some(params.max_speed),
        show_watermark: Some(params.show_watermark),
    };

    let init = client.videos().upload_init(&request).await?;
    let video_id = init.video.id;
    if init.upload_url.trim().is_empty() || video_id == 0 {
        return Err(Error::other("업로드 초기화에 실패했습니다."));
    }

    let progress_tracker = tracker.clone();
    let progress_task = task_id.to_string();
    let on_progress: ProgressFn = Arc::new(move |percent| {
        progress_tracker.update_progress(&progress_task, f64::from(percent));
    });

    uploader
        .upload(
            &init.upload_url,
            params.body,
            init.content_type.as_deref(),
            Some(on_progress),
        )
        .result()
        .await?;

    client.videos().upload_complete(video_id).await?;
    Ok(video_id)
}

fn upload_failure_message(err: &Error) -> String {
    let message = err.korean_desc();
    if message.trim().is_empty() {
        "업로드에 실패했습니다.".to_string()
    } else {
        message
    }
}
