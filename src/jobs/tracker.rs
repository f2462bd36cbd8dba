//! In-process tracker for long-running tasks
//!
//! Uploads and worker jobs register here so a status bar can show progress.
//! Subscribers receive a full snapshot on every change.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::watch;

/// Lifecycle of a tracked task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    Pending,
    Success,
    Error,
}

/// Backend job a task is waiting on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerMeta {
    pub job_id: String,
    pub job_type: String,
}

/// Encoding step reported by the video pipeline
#[derive(Debug, Clone, PartialEq)]
pub struct EncodingStep {
    pub index: u32,
    pub total: u32,
    pub name: String,
    pub percent: f64,
}

/// One tracked task
#[derive(Debug, Clone, PartialEq)]
pub struct AsyncTask {
    pub id: String,
    pub label: String,
    pub status: TaskStatus,
    /// 0..=100
    pub progress: Option<u8>,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub worker: Option<WorkerMeta>,
    pub encoding_step: Option<EncodingStep>,
}

/// Shared task list with change notification
///
/// Cloning shares the same list.
#[derive(Debug, Clone)]
pub struct AsyncStatusStore {
    tx: Arc<watch::Sender<Vec<AsyncTask>>>,
}

impl Default for AsyncStatusStore {
    fn default() -> Self {
        Self::new()
    }
}

impl AsyncStatusStore {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(Vec::new());
        Self { tx: Arc::new(tx) }
    }

    /// Current task list
    pub fn snapshot(&self) -> Vec<AsyncTask> {
        self.tx.borrow().clone()
    }

    /// Single task by id
    pub fn get(&self, id: &str) -> Option<AsyncTask> {
        self.tx.borrow().iter().find(|t| t.id == id).cloned()
    }

    /// Receive a snapshot after every change
    pub fn subscribe(&self) -> watch::Receiver<Vec<AsyncTask>> {
        self.tx.subscribe()
    }

    /// Register a pending task, replacing any task with the same id
    pub fn add_task(&self, label: &str, id: Option<&str>) -> String {
        let id = id.map_or_else(generate_task_id, str::to_string);
        let task = AsyncTask {
            id: id.clone(),
            label: label.to_string(),
            status: TaskStatus::Pending,
            progress: None,
            error: None,
            created_at: Utc::now(),
            worker: None,
            encoding_step: None,
        };
        self.tx.send_modify(|tasks| {
            tasks.retain(|t| t.id != id);
            tasks.push(task);
        });
        id
    }

    /// Set progress, clamped to 0..=100
    pub fn update_progress(&self, id: &str, progress: f64) {
        let clamped = clamp_percent(progress);
        self.modify(id, |t| t.progress = Some(clamped));
    }

    /// Set progress together with the current encoding step
    pub fn update_encoding(&self, id: &str, progress: f64, step: EncodingStep) {
        let clamped = clamp_percent(progress);
        self.modify(id, |t| {
            t.progress = Some(clamped);
            t.encoding_step = Some(step);
        });
    }

    /// Mark finished; progress goes to 100 either way
    pub fn complete_task(&self, id: &str, status: TaskStatus, error: Option<&str>) {
        self.modify(id, |t| {
            t.status = status;
            t.progress = Some(100);
            t.error = error.map(str::to_string);
        });
    }

    /// Change the label only
    pub fn set_task_label(&self, id: &str, label: &str) {
        self.modify(id, |t| t.label = label.to_string());
    }

    /// Hand the task over to a backend worker job
    pub fn attach_worker_meta(&self, id: &str, job_id: &str, job_type: &str) {
        self.modify(id, |t| {
            t.worker = Some(WorkerMeta {
                job_id: job_id.to_string(),
                job_type: job_type.to_string(),
            });
        });
    }

    /// Remove one task (user dismissed it)
    pub fn remove_task(&self, id: &str) {
        self.tx.send_modify(|tasks| tasks.retain(|t| t.id != id));
    }

    /// Remove every finished task
    pub fn clear_completed(&self) {
        self.tx
            .send_modify(|tasks| tasks.retain(|t| t.status == TaskStatus::Pending));
    }

    fn modify(&self, id: &str, f: impl FnOnce(&mut AsyncTask)) {
        self.tx.send_if_modified(|tasks| match tasks.iter_mut().find(|t| t.id == id) {
            Some(task) => {
                f(task);
                true
            }
            None => {
                tracing::debug!(task_id = id, "Ignoring update for unknown task");
                false
            }
        });
    }
}

fn clamp_percent(progress: f64) -> u8 {
    if progress.is_nan() {
        return 0;
    }
    progress.round().clamp(0.0, 100.0) as u8
}

fn generate_task_id() -> String {
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!("async-{}-{}", Utc::now().timestamp_millis(), &suffix[..7])
}
