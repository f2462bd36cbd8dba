//! Exam submissions, manual review, and OMR sheet upload

use std::fmt;

use bytes::Bytes;
use reqwest::multipart::{Form, Part};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use super::{ensure_id, Id};
use crate::error::Result;
use crate::http::{ApiClient, ApiError};

const SUBMISSIONS_PATH: &str = "/submissions/submissions/";

/// OMR upload endpoints, tried in order while the backend answers 404
const OMR_UPLOAD_SUFFIXES: &[&str] = &["omr/upload/", "omr/batch/", "omr/files/", "omr/"];

const DEFAULT_REJECTION_MESSAGE: &str = "입력 조건을 확인해 주세요.";

/// Grading pipeline state of a submission
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SubmissionStatus {
    Submitted,
    Dispatched,
    Extracting,
    NeedsIdentification,
    AnswersReady,
    Grading,
    Done,
    Failed,
    Other(String),
}

impl SubmissionStatus {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "submitted" | "pending" => Self::Submitted,
            "dispatched" => Self::Dispatched,
            "extracting" | "processing" => Self::Extracting,
            "needs_identification" => Self::NeedsIdentification,
            "answers_ready" => Self::AnswersReady,
            "grading" => Self::Grading,
            "done" => Self::Done,
            "failed" => Self::Failed,
            _ => Self::Other(raw.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Submitted => "submitted",
            Self::Dispatched => "dispatched",
            Self::Extracting => "extracting",
            Self::NeedsIdentification => "needs_identification",
            Self::AnswersReady => "answers_ready",
            Self::Grading => "grading",
            Self::Done => "done",
            Self::Failed => "failed",
            Self::Other(raw) => raw,
        }
    }

    /// Polling stops once a submission reaches one of these
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed | Self::NeedsIdentification)
    }
}

impl fmt::Display for SubmissionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for SubmissionStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for SubmissionStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::parse(&raw))
    }
}

// ============================================================================
// AI job contract
// ============================================================================

/// Status of the backend AI job attached to a submission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AiJobStatus {
    Pending,
    Validating,
    Running,
    Done,
    Failed,
    RejectedBadInput,
    FallbackToGpu,
    Retrying,
    ReviewRequired,
}

impl AiJobStatus {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Pending => "처리 대기",
            Self::Validating => "업로드 검증 중",
            Self::Running => "분석 중",
            Self::Done => "완료",
            Self::Failed => "분석 실패",
            Self::RejectedBadInput => "조건 미충족",
            Self::FallbackToGpu => "고급 분석 중",
            Self::Retrying => "재시도 중",
            Self::ReviewRequired => "조교 검토 필요",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Done | Self::Failed | Self::RejectedBadInput | Self::ReviewRequired
        )
    }
}

/// User-facing message for a pre-validation rejection code
pub fn rejection_message(code: Option<&str>) -> &'static str {
    match code.map(str::trim) {
        Some("RESOLUTION_TOO_LOW") => "해상도가 낮습니다. 더 선명하게 촬영해 주세요.",
        Some("FILE_TOO_LARGE") => "파일 크기가 제한을 초과했습니다.",
        Some("VIDEO_TOO_LONG") => "동영상 길이 제한을 초과했습니다.",
        Some("BLUR_OR_SHAKE") => "흔들리거나 흐릿합니다. 고정해서 다시 촬영해 주세요.",
        Some("TOO_DARK") => "너무 어둡습니다. 밝은 곳에서 촬영해 주세요.",
        Some("INVALID_FORMAT") => "지원하지 않는 파일 형식입니다.",
        Some("OMR_PHOTO_NOT_ALLOWED") => {
            "Basic 요금제에서는 스캔된 OMR만 가능합니다. 촬영물은 Premium에서 이용해 주세요."
        }
        _ => DEFAULT_REJECTION_MESSAGE,
    }
}

// ============================================================================
// Models
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Submission {
    pub id: Id,
    #[serde(default)]
    pub enrollment_id: Option<Id>,
    #[serde(default)]
    pub student_name: Option<String>,
    #[serde(default)]
    pub target_type: Option<String>,
    #[serde(default)]
    pub target_id: Option<Id>,
    pub status: SubmissionStatus,
    #[serde(default)]
    pub ai_job_status: Option<AiJobStatus>,
    #[serde(default)]
    pub rejection_code: Option<String>,
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SubmissionFilter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_type: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_id: Option<Id>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enrollment_id: Option<Id>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<SubmissionStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
}

impl SubmissionFilter {
    pub fn for_exam(exam_id: Id) -> Self {
        Self {
            target_type: Some("exam"),
            target_id: Some(exam_id),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ManualAnswer {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub question_id: Option<Id>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub question_no: Option<u32>,
    #[serde(default)]
    pub answer: String,
}

/// Recognised answers of a submission, editable by an assistant
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ManualReview {
    #[serde(default)]
    pub identifier: Option<String>,
    #[serde(default)]
    pub answers: Vec<ManualAnswer>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Value>,
}

#[derive(Debug, Clone, Deserialize)]
struct RawSubmitResponse {
    #[serde(default = "default_ok")]
    ok: bool,
    #[serde(default, alias = "id")]
    submission_id: Option<Id>,
    #[serde(default)]
    job_id: Option<Value>,
    #[serde(default)]
    rejection_code: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

fn default_ok() -> bool {
    true
}

/// Result of an OMR sheet upload
#[derive(Debug, Clone, PartialEq)]
pub enum OmrUploadOutcome {
    Accepted {
        submission_id: Option<Id>,
        job_id: Option<String>,
    },
    /// Pre-validation refused the file; no job was created
    Rejected {
        code: Option<String>,
        message: String,
    },
}

impl From<RawSubmitResponse> for OmrUploadOutcome {
    fn from(raw: RawSubmitResponse) -> Self {
        if raw.ok && raw.rejection_code.is_none() {
            let job_id = match raw.job_id {
                Some(Value::String(s)) => Some(s),
                Some(Value::Number(n)) => Some(n.to_string()),
                _ => None,
            };
            return Self::Accepted {
                submission_id: raw.submission_id,
                job_id,
            };
        }
        let message = match raw.rejection_code.as_deref() {
            Some(_) => rejection_message(raw.rejection_code.as_deref()).to_string(),
            None => raw
                .error
                .filter(|e| !e.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_REJECTION_MESSAGE.to_string()),
        };
        Self::Rejected {
            code: raw.rejection_code,
            message,
        }
    }
}

/// OMR sheet file to upload for one exam
#[derive(Debug, Clone)]
pub struct OmrUpload {
    pub exam_id: Id,
    pub enrollment_id: Option<Id>,
    pub file_name: String,
    pub content_type: Option<String>,
    pub body: Bytes,
}

impl OmrUpload {
    fn form(&self) -> Form {
        let part = || Part::bytes(self.body.to_vec()).file_name(self.file_name.clone());
        let part = match self.content_type.as_deref() {
            Some(mime) => part().mime_str(mime).unwrap_or_else(|e| {
                tracing::warn!(content_type = mime, error = %e, "Ignoring invalid OMR content type");
                part()
            }),
            None => part(),
        };
        let mut form = Form::new().part("file", part);
        if let Some(enrollment) = self.enrollment_id.filter(|id| *id > 0) {
            form = form.text("enrollment_id", enrollment.to_string());
        }
        form
    }
}

pub struct SubmissionsApi<'a> {
    client: &'a ApiClient,
}

impl<'a> SubmissionsApi<'a> {
    pub(crate) fn new(client: &'a ApiClient) -> Self {
        Self { client }
    }

    pub async fn list(&self, filter: &SubmissionFilter) -> Result<Vec<Submission>> {
        self.client.get_list(SUBMISSIONS_PATH, Some(filter)).await
    }

    pub async fn get(&self, submission_id: Id) -> Result<Submission> {
        ensure_id(submission_id, "유효하지 않은 submissionId")?;
        Ok(self
            .client
            .get(&format!("{SUBMISSIONS_PATH}{submission_id}/"))
            .await?)
    }

    /// Current pipeline status only
    pub async fn status(&self, submission_id: Id) -> Result<SubmissionStatus> {
        Ok(self.get(submission_id).await?.status)
    }

    /// Re-run grading; the backend only accepts failed submissions
    pub async fn retry(&self, submission_id: Id) -> Result<Value> {
        ensure_id(submission_id, "유효하지 않은 submissionId")?;
        Ok(self
            .client
            .post_empty(&format!("{SUBMISSIONS_PATH}{submission_id}/retry/"))
            .await?)
    }

    pub async fn manual_review(&self, submission_id: Id) -> Result<ManualReview> {
        ensure_id(submission_id, "유효하지 않은 submissionId")?;
        Ok(self
            .client
            .get(&format!("{SUBMISSIONS_PATH}{submission_id}/manual-review/"))
            .await?)
    }

    /// Save corrected answers and trigger regrading
    pub async fn save_manual_review(&self, submission_id: Id, review: &ManualReview) -> Result<Value> {
        ensure_id(submission_id, "유효하지 않은 submissionId")?;
        Ok(self
            .client
            .post(
                &format!("{SUBMISSIONS_PATH}{submission_id}/manual-review/"),
                review,
            )
            .await?)
    }

    /// Upload a scanned OMR sheet
    ///
    /// Deployments expose different upload routes; a 404 moves on to the next
    /// candidate. A 4xx body carrying `rejection_code` is reported as
    /// [`OmrUploadOutcome::Rejected`].
    pub async fn upload_omr(&self, upload: &OmrUpload) -> Result<OmrUploadOutcome> {
        ensure_id(upload.exam_id, "유효하지 않은 examId")?;
        if upload.body.is_empty() {
            return Err(ApiError::InvalidRequest("files required".to_string()).into());
        }

        let mut last_err = None;
        for suffix in OMR_UPLOAD_SUFFIXES {
            let path = format!("/submissions/exams/{}/{suffix}", upload.exam_id);
            match self
                .client
                .post_multipart::<Value, _>(&path, || upload.form())
                .await
            {
                Ok(value) => {
                    let raw: RawSubmitResponse = serde_json::from_value(value)
                        .map_err(|e| ApiError::Body(e.to_string()))?;
                    return Ok(raw.into());
                }
                Err(ApiError::Http { status: 404, message }) => {
                    tracing::debug!(path = %path, "OMR upload route not found, trying next");
                    last_err = Some(ApiError::Http { status: 404, message });
                }
                Err(ApiError::Http { status, message }) if (400..500).contains(&status) => {
                    if let Some(outcome) = rejection_from_message(&message) {
                        return Ok(outcome);
                    }
                    return Err(ApiError::Http { status, message }.into());
                }
                Err(e) => return Err(e.into()),
            }
        }
        Err(last_err
            .unwrap_or_else(|| ApiError::InvalidRequest("OMR 업로드 경로가 없습니다.".to_string()))
            .into())
    }
}

/// Rejection codes travel as the message when the body had no `detail`
fn rejection_from_message(message: &str) -> Option<OmrUploadOutcome> {
    let trimmed = message.trim();
    let code = if let Ok(raw) = serde_json::from_str::<RawSubmitResponse>(trimmed) {
        raw.rejection_code?
    } else if rejection_message(Some(trimmed)) != DEFAULT_REJECTION_MESSAGE {
        trimmed.to_string()
    } else {
        return None;
    };
    Some(OmrUploadOutcome::Rejected {
        message: rejection_message(Some(&code)).to_string(),
        code: Some(code),
    })
}
