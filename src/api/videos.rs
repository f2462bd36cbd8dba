//! Session videos: operator management and student playback

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{ensure_id, Id};
use crate::error::Result;
use crate::http::{decode_one, ApiClient, ApiError};

const VIDEOS_PATH: &str = "/media/videos/";
const STUDENT_VIDEO_PATH: &str = "/student/video/";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum VideoStatus {
    Pending,
    Uploaded,
    Processing,
    Ready,
    Failed,
}

impl VideoStatus {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Pending => "업로드 대기",
            Self::Uploaded => "업로드 완료",
            Self::Processing => "처리 중",
            Self::Ready => "재생 가능",
            Self::Failed => "실패",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Video {
    pub id: Id,
    #[serde(default)]
    pub session: Option<Id>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub status: Option<VideoStatus>,
    #[serde(default)]
    pub duration: Option<f64>,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
    #[serde(default)]
    pub allow_skip: bool,
    #[serde(default = "default_speed")]
    pub max_speed: f64,
    #[serde(default)]
    pub show_watermark: bool,
    #[serde(default)]
    pub created_at: Option<String>,
}

fn default_speed() -> f64 {
    1.0
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EffectiveRule {
    Free,
    Once,
    Blocked,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoStudentStat {
    pub enrollment: Id,
    #[serde(default)]
    pub student_name: String,
    #[serde(default)]
    pub progress: f64,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub attendance_status: Option<String>,
    #[serde(default)]
    pub effective_rule: Option<EffectiveRule>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoStats {
    pub video: Video,
    #[serde(default)]
    pub students: Vec<VideoStudentStat>,
    #[serde(default)]
    pub total_filtered: Option<u32>,
}

/// Proposed policy change to preview
#[derive(Debug, Clone, Default, Serialize)]
pub struct PolicyChange {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allow_skip: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_speed: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub show_watermark: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyImpact {
    pub eligible_count: u32,
    pub impacted_count: u32,
    pub changed_fields: Vec<String>,
    pub breakdown_by_rule: BTreeMap<String, u32>,
    pub sample: Vec<Value>,
}

// ============================================================================
// Upload lifecycle
// ============================================================================

/// `POST /media/videos/upload/init/` body
#[derive(Debug, Clone, Serialize)]
pub struct UploadInitRequest {
    pub session: Id,
    pub title: String,
    pub filename: String,
    pub content_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allow_skip: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_speed: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub show_watermark: Option<bool>,
}

/// Pre-signed PUT target for a freshly created video row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadInitResponse {
    pub video: Video,
    pub upload_url: String,
    #[serde(default)]
    pub file_key: Option<String>,
    /// Content-Type the URL was signed with
    #[serde(default)]
    pub content_type: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoProgress {
    pub status: Option<VideoStatus>,
    pub upload_step_index: Option<u32>,
    pub upload_step_total: Option<u32>,
    pub upload_step_name: Option<String>,
    pub upload_step_percent: Option<f64>,
    pub upload_progress: Option<f64>,
}

// ============================================================================
// Student playback
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Playback {
    #[serde(default)]
    pub video: Option<Video>,
    #[serde(default, alias = "url", alias = "hls_url")]
    pub play_url: Option<String>,
    #[serde(default)]
    pub policy: Option<Value>,
    #[serde(default)]
    pub last_position: Option<f64>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProgressReport {
    pub progress: f64,
    pub completed: bool,
    pub last_position: f64,
}

#[derive(Debug, Serialize)]
struct EnrollmentQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    enrollment: Option<Id>,
}

#[derive(Debug, Serialize)]
struct SessionQuery {
    session: Id,
}

#[derive(Debug, Serialize)]
struct OkBody {
    ok: bool,
}

pub struct VideosApi<'a> {
    client: &'a ApiClient,
}

impl<'a> VideosApi<'a> {
    pub(crate) fn new(client: &'a ApiClient) -> Self {
        Self { client }
    }

    pub async fn list(&self, session_id: Id) -> Result<Vec<Video>> {
        ensure_id(session_id, "차시 ID가 올바르지 않습니다.")?;
        self.client
            .get_list(VIDEOS_PATH, Some(&SessionQuery { session: session_id }))
            .await
    }

    pub async fn get(&self, video_id: Id) -> Result<Video> {
        ensure_id(video_id, "유효한 영상이 아닙니다.")?;
        Ok(self.client.get(&format!("{VIDEOS_PATH}{video_id}/")).await?)
    }

    pub async fn stats(&self, video_id: Id) -> Result<VideoStats> {
        ensure_id(video_id, "유효한 영상이 아닙니다.")?;
        Ok(self
            .client
            .get(&format!("{VIDEOS_PATH}{video_id}/stats/"))
            .await?)
    }

    /// Re-run processing for a failed video
    pub async fn retry(&self, video_id: Id) -> Result<Value> {
        ensure_id(video_id, "유효한 영상이 아닙니다.")?;
        Ok(self
            .client
            .post_empty(&format!("{VIDEOS_PATH}{video_id}/retry/"))
            .await?)
    }

    pub async fn policy_impact(&self, video_id: Id, change: &PolicyChange) -> Result<PolicyImpact> {
        ensure_id(video_id, "유효한 영상이 아닙니다.")?;
        Ok(self
            .client
            .get_with_query(&format!("{VIDEOS_PATH}{video_id}/policy-impact/"), change)
            .await?)
    }

    /// `PATCH /media/videos/{id}/` with the new playback policy
    pub async fn update_policy(&self, video_id: Id, change: &PolicyChange) -> Result<Video> {
        ensure_id(video_id, "유효한 영상이 아닙니다.")?;
        Ok(self
            .client
            .patch(&format!("{VIDEOS_PATH}{video_id}/"), change)
            .await?)
    }

    pub async fn upload_init(&self, request: &UploadInitRequest) -> Result<UploadInitResponse> {
        ensure_id(request.session, "차시 ID가 올바르지 않습니다.")?;
        Ok(self
            .client
            .post(&format!("{VIDEOS_PATH}upload/init/"), request)
            .await?)
    }

    pub async fn upload_complete(&self, video_id: Id) -> Result<Value> {
        ensure_id(video_id, "유효한 영상이 아닙니다.")?;
        Ok(self
            .client
            .post(
                &format!("{VIDEOS_PATH}{video_id}/upload/complete/"),
                &OkBody { ok: true },
            )
            .await?)
    }

    pub async fn progress(&self, video_id: Id) -> Result<VideoProgress> {
        ensure_id(video_id, "유효한 영상이 아닙니다.")?;
        Ok(self
            .client
            .get(&format!("{VIDEOS_PATH}{video_id}/progress/"))
            .await?)
    }

    pub async fn delete(&self, video_id: Id) -> Result<()> {
        ensure_id(video_id, "유효한 영상이 아닙니다.")?;
        Ok(self
            .client
            .delete(&format!("{VIDEOS_PATH}{video_id}/"))
            .await?)
    }

    // ========================================================================
    // Student
    // ========================================================================

    pub async fn playback(&self, video_id: Id, enrollment_id: Option<Id>) -> Result<Playback> {
        ensure_id(video_id, "유효한 영상이 아닙니다.")?;
        let value: Value = self
            .client
            .get_with_query(
                &format!("{STUDENT_VIDEO_PATH}videos/{video_id}/playback/"),
                &EnrollmentQuery {
                    enrollment: enrollment_id,
                },
            )
            .await?;
        if !value.is_object() {
            return Err(ApiError::Body("재생 정보를 받지 못했습니다.".to_string()).into());
        }
        Ok(decode_one(value)?)
    }

    pub async fn report_progress(&self, video_id: Id, report: &ProgressReport) -> Result<Value> {
        ensure_id(video_id, "유효한 영상이 아닙니다.")?;
        Ok(self
            .client
            .post(
                &format!("{STUDENT_VIDEO_PATH}videos/{video_id}/progress/"),
                report,
            )
            .await?)
    }

    /// Courses and sessions visible to the signed-in student
    pub async fn my_videos(&self) -> Result<Value> {
        Ok(self.client.get(&format!("{STUDENT_VIDEO_PATH}me/")).await?)
    }

    pub async fn student_session_videos(&self, session_id: Id) -> Result<Vec<Video>> {
        ensure_id(session_id, "차시 ID가 올바르지 않습니다.")?;
        self.client
            .get_list::<_, super::NoQuery>(
                &format!("{STUDENT_VIDEO_PATH}sessions/{session_id}/videos/"),
                None,
            )
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use serde_json::json;

    #[test]
    fn test_upload_init_body_skips_unset_policy() {
        let req = UploadInitRequest {
            session: 3,
            title: "1강".to_string(),
            filename: "a.mp4".to_string(),
            content_type: "video/mp4".to_string(),
            description: None,
            allow_skip: None,
            max_speed: Some(1.5),
            show_watermark: None,
        };
        assert_eq!(
            serde_json::to_value(&req).unwrap(),
            json!({
                "session": 3,
                "title": "1강",
                "filename": "a.mp4",
                "content_type": "video/mp4",
                "max_speed": 1.5
            })
        );
    }

    #[test]
    fn test_video_status_codes() {
        let video: Video = serde_json::from_value(json!({"id": 1, "status": "PROCESSING"})).unwrap();
        assert_eq!(video.status, Some(VideoStatus::Processing));
        assert_eq!(video.max_speed, 1.0);
        assert_eq!(VideoStatus::Ready.label(), "재생 가능");
    }

    #[tokio::test]
    async fn test_playback_rejects_invalid_id() {
        let client = ApiClient::with_base_url("http://127.0.0.1:9", MemoryStore::shared()).unwrap();
        let err = client.videos().playback(0, None).await.unwrap_err();
        assert!(err.to_string().contains("유효한 영상이 아닙니다."));
    }
}
