//! View models for the user-visible states of a page
//!
//! Loading and empty placeholders, toast notifications, and the student exam
//! result view. Nothing here talks to the network.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use crate::api::exams::{ResultItem, StudentExamResult};
use crate::error::ClientErrorTrait;
use crate::query::QueryState;
use crate::utils::format_date_time;

pub const LOADING_TEXT: &str = "불러오는 중...";
pub const EMPTY_TEXT: &str = "데이터가 없습니다.";

/// How long a toast stays on screen
pub const TOAST_DURATION: Duration = Duration::from_secs(3);

// ============================================================================
// Load states
// ============================================================================

#[derive(Debug, PartialEq)]
pub enum LoadView<'a, T> {
    Loading,
    Empty,
    Error(String),
    Ready(&'a T),
}

impl<'a, T> LoadView<'a, T> {
    /// Map a query state onto what the page shows
    ///
    /// `is_empty` decides when loaded data counts as "nothing to show".
    pub fn from_state(state: &'a QueryState<T>, is_empty: impl FnOnce(&T) -> bool) -> Self {
        match state {
            QueryState::Loading => Self::Loading,
            QueryState::Error(e) => Self::Error(e.korean_desc()),
            QueryState::Success(data) if is_empty(data) => Self::Empty,
            QueryState::Success(data) => Self::Ready(data),
        }
    }

    /// Placeholder text, `None` once data is ready
    pub fn message(&self) -> Option<&str> {
        match self {
            Self::Loading => Some(LOADING_TEXT),
            Self::Empty => Some(EMPTY_TEXT),
            Self::Error(msg) => Some(msg.as_str()),
            Self::Ready(_) => None,
        }
    }
}

impl<'a, T> LoadView<'a, Vec<T>> {
    pub fn from_list(state: &'a QueryState<Vec<T>>) -> Self {
        Self::from_state(state, Vec::is_empty)
    }
}

// ============================================================================
// Toasts
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastKind {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    pub id: u64,
    pub kind: ToastKind,
    pub message: String,
    pub shown_at: Instant,
}

impl Toast {
    pub fn is_expired(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.shown_at) >= TOAST_DURATION
    }
}

/// Queue of transient notifications
#[derive(Debug, Default)]
pub struct ToastCenter {
    toasts: VecDeque<Toast>,
    next_id: u64,
}

impl ToastCenter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_success(&mut self, message: impl Into<String>, now: Instant) -> u64 {
        self.push(ToastKind::Success, message.into(), now)
    }

    pub fn push_error(&mut self, message: impl Into<String>, now: Instant) -> u64 {
        self.push(ToastKind::Error, message.into(), now)
    }

    /// Error toast carrying the user-facing message of `err`
    pub fn push_failure(&mut self, err: &dyn ClientErrorTrait, now: Instant) -> u64 {
        self.push(ToastKind::Error, err.korean_desc(), now)
    }

    fn push(&mut self, kind: ToastKind, message: String, now: Instant) -> u64 {
        self.next_id += 1;
        self.toasts.push_back(Toast {
            id: self.next_id,
            kind,
            message,
            shown_at: now,
        });
        self.next_id
    }

    pub fn dismiss(&mut self, id: u64) {
        self.toasts.retain(|t| t.id != id);
    }

    /// Toasts still on screen at `now`, oldest first
    pub fn visible(&self, now: Instant) -> impl Iterator<Item = &Toast> {
        self.toasts.iter().filter(move |t| !t.is_expired(now))
    }

    /// Drop expired toasts, returning how many went away
    pub fn prune(&mut self, now: Instant) -> usize {
        let before = self.toasts.len();
        self.toasts.retain(|t| !t.is_expired(now));
        before - self.toasts.len()
    }

    pub fn len(&self) -> usize {
        self.toasts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.toasts.is_empty()
    }
}

// ============================================================================
// Exam result
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct ResultRow {
    pub number: String,
    pub student_answer: String,
    pub correct_answer: String,
    pub is_correct: bool,
    pub score: f64,
    pub max_score: f64,
}

impl From<(usize, &ResultItem)> for ResultRow {
    fn from((index, item): (usize, &ResultItem)) -> Self {
        Self {
            number: item
                .question_number
                .map_or_else(|| (index + 1).to_string(), |n| n.to_string()),
            student_answer: item.student_answer.clone().unwrap_or_else(|| "-".to_string()),
            correct_answer: item.correct_answer.clone().unwrap_or_else(|| "-".to_string()),
            is_correct: item.is_correct,
            score: item.score,
            max_score: item.max_score,
        }
    }
}

/// What the student result page shows
///
/// Scores and the retake flag come from the server untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct ExamResultView {
    pub total_score: f64,
    pub max_score: f64,
    pub is_pass: Option<bool>,
    pub can_retake: bool,
    pub clinic_required: bool,
    pub submitted_at: String,
    pub rows: Vec<ResultRow>,
}

impl ExamResultView {
    pub fn correct_count(&self) -> usize {
        self.rows.iter().filter(|r| r.is_correct).count()
    }

    pub fn pass_label(&self) -> &'static str {
        match self.is_pass {
            Some(true) => "합격",
            Some(false) => "불합격",
            None => "-",
        }
    }
}

impl From<&StudentExamResult> for ExamResultView {
    fn from(result: &StudentExamResult) -> Self {
        Self {
            total_score: result.total_score,
            max_score: result.max_score,
            is_pass: result.is_pass,
            can_retake: result.can_retake.unwrap_or(false),
            clinic_required: result.clinic_required.unwrap_or(false),
            submitted_at: format_date_time(result.submitted_at.as_deref()),
            rows: result.items.iter().enumerate().map(ResultRow::from).collect(),
        }
    }
}

impl From<StudentExamResult> for ExamResultView {
    fn from(result: StudentExamResult) -> Self {
        Self::from(&result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::http::ApiError;
    use serde_json::json;
    use std::sync::Arc;

    #[test]
    fn test_load_view_states() {
        let loading: QueryState<Vec<u32>> = QueryState::Loading;
        assert_eq!(LoadView::from_list(&loading).message(), Some(LOADING_TEXT));

        let empty: QueryState<Vec<u32>> = QueryState::Success(vec![]);
        assert_eq!(LoadView::from_list(&empty), LoadView::Empty);

        let ready = QueryState::Success(vec![1u32]);
        assert_eq!(LoadView::from_list(&ready), LoadView::Ready(&vec![1]));

        let failed: QueryState<Vec<u32>> = QueryState::Error(Arc::new(Error::from(
            ApiError::InvalidRequest("시험 ID가 올바르지 않습니다.".to_string()),
        )));
        assert!(matches!(LoadView::from_list(&failed), LoadView::Error(_)));
    }

    #[test]
    fn test_toasts_expire_after_three_seconds() {
        let start = Instant::now();
        let mut center = ToastCenter::new();
        center.push_success("저장되었습니다.", start);
        center.push_error("실패했습니다.", start + Duration::from_secs(2));

        assert_eq!(center.visible(start + Duration::from_millis(2999)).count(), 2);
        let later = start + Duration::from_secs(3);
        let visible: Vec<_> = center.visible(later).map(|t| t.kind).collect();
        assert_eq!(visible, vec![ToastKind::Error]);

        assert_eq!(center.prune(later), 1);
        assert_eq!(center.len(), 1);
    }

    #[test]
    fn test_exam_result_view_passes_scores_through() {
        let result: StudentExamResult = serde_json::from_value(json!({
            "target_type": "exam", "target_id": 7, "enrollment_id": 3,
            "total_score": 87.5, "max_score": 100.0, "is_pass": true,
            "submitted_at": "2024-03-01T01:00:00Z",
            "items": [
                {"question_id": 1, "answer": "3", "correct_answer": "3", "is_correct": true, "score": 5.0, "max_score": 5.0},
                {"question_id": 2, "question_number": 2, "student_answer": null, "correct_answer": "1", "is_correct": false, "score": 0.0, "max_score": 5.0}
            ],
            "can_retake": true
        }))
        .unwrap();

        let view = ExamResultView::from(&result);
        assert_eq!(view.total_score, 87.5);
        assert_eq!(view.max_score, 100.0);
        assert!(view.can_retake);
        assert_eq!(view.submitted_at, "2024.03.01 10:00");
        assert_eq!(view.correct_count(), 1);
        assert_eq!(view.rows[0].number, "1");
        assert_eq!(view.rows[1].student_answer, "-");
        assert_eq!(view.pass_label(), "합격");
    }
}
