//! Session attendance
//!
//! Statuses are the backend's upper-case codes (`PRESENT`, `LATE`, `ONLINE`,
//! `SUPPLEMENT`, `EARLY_LEAVE`, `ABSENT`, `RUNAWAY`, `MATERIAL`, `INACTIVE`,
//! `SECESSION`). Unknown codes are kept as-is.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::{ensure_id, Id};
use crate::error::Result;
use crate::http::{decode_list, ApiClient, ApiError};

const ATTENDANCE_PATH: &str = "/lectures/attendance/";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AttendanceStatus {
    Present,
    Late,
    Online,
    Supplement,
    EarlyLeave,
    Absent,
    Runaway,
    Material,
    Inactive,
    Secession,
    Other(String),
}

impl AttendanceStatus {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_uppercase().as_str() {
            "PRESENT" => Self::Present,
            "LATE" => Self::Late,
            "ONLINE" => Self::Online,
            "SUPPLEMENT" => Self::Supplement,
            "EARLY_LEAVE" => Self::EarlyLeave,
            "ABSENT" => Self::Absent,
            "RUNAWAY" => Self::Runaway,
            "MATERIAL" => Self::Material,
            "INACTIVE" => Self::Inactive,
            "SECESSION" => Self::Secession,
            _ => Self::Other(raw.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Present => "PRESENT",
            Self::Late => "LATE",
            Self::Online => "ONLINE",
            Self::Supplement => "SUPPLEMENT",
            Self::EarlyLeave => "EARLY_LEAVE",
            Self::Absent => "ABSENT",
            Self::Runaway => "RUNAWAY",
            Self::Material => "MATERIAL",
            Self::Inactive => "INACTIVE",
            Self::Secession => "SECESSION",
            Self::Other(raw) => raw,
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Self::Present => "현장",
            Self::Late => "지각",
            Self::Online => "영상",
            Self::Supplement => "보강",
            Self::EarlyLeave => "조퇴",
            Self::Absent => "결석",
            Self::Runaway => "출튀",
            Self::Material => "자료",
            Self::Inactive => "부재",
            Self::Secession => "탈퇴",
            Self::Other(raw) => raw,
        }
    }
}

impl fmt::Display for AttendanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for AttendanceStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for AttendanceStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::parse(&raw))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttendanceRecord {
    pub id: Id,
    #[serde(default)]
    pub session: Option<Id>,
    #[serde(default)]
    pub enrollment: Option<Id>,
    #[serde(default)]
    pub student: Option<Id>,
    #[serde(default)]
    pub name: String,
    pub status: AttendanceStatus,
    #[serde(default)]
    pub memo: String,
}

/// Partial record update; only set fields are sent
#[derive(Debug, Clone, Default, Serialize)]
pub struct AttendanceUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<AttendanceStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memo: Option<String>,
}

#[derive(Debug, Serialize)]
struct BulkCreateBody<'a> {
    session: Id,
    students: &'a [Id],
}

#[derive(Debug, Serialize)]
struct SessionQuery {
    session: Id,
}

#[derive(Debug, Serialize)]
struct LectureQuery {
    lecture: Id,
}

// ============================================================================
// Lecture matrix
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatrixLecture {
    pub id: Id,
    #[serde(default)]
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatrixSession {
    pub id: Id,
    #[serde(default)]
    pub order: Option<u32>,
    #[serde(default)]
    pub date: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatrixCell {
    #[serde(default)]
    pub attendance_id: Option<Id>,
    #[serde(default)]
    pub status: Option<AttendanceStatus>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatrixStudent {
    pub student_id: Id,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub parent_phone: Option<String>,
    /// Keyed by session id as sent on the wire
    #[serde(default)]
    pub attendance: BTreeMap<String, MatrixCell>,
}

impl MatrixStudent {
    pub fn cell(&self, session_id: Id) -> Option<&MatrixCell> {
        self.attendance.get(&session_id.to_string())
    }
}

/// Students by sessions grid for a whole lecture
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttendanceMatrix {
    pub lecture: MatrixLecture,
    #[serde(default)]
    pub sessions: Vec<MatrixSession>,
    #[serde(default)]
    pub students: Vec<MatrixStudent>,
}

pub struct AttendanceApi<'a> {
    client: &'a ApiClient,
}

impl<'a> AttendanceApi<'a> {
    pub(crate) fn new(client: &'a ApiClient) -> Self {
        Self { client }
    }

    pub async fn list(&self, session_id: Id) -> Result<Vec<AttendanceRecord>> {
        ensure_id(session_id, "차시 ID가 올바르지 않습니다.")?;
        self.client
            .get_list(ATTENDANCE_PATH, Some(&SessionQuery { session: session_id }))
            .await
    }

    pub async fn update(&self, attendance_id: Id, update: &AttendanceUpdate) -> Result<AttendanceRecord> {
        ensure_id(attendance_id, "출결 ID가 올바르지 않습니다.")?;
        Ok(self
            .client
            .patch(&format!("{ATTENDANCE_PATH}{attendance_id}/"), update)
            .await?)
    }

    pub async fn delete(&self, attendance_id: Id) -> Result<()> {
        ensure_id(attendance_id, "출결 ID가 올바르지 않습니다.")?;
        Ok(self
            .client
            .delete(&format!("{ATTENDANCE_PATH}{attendance_id}/"))
            .await?)
    }

    /// Register students to a session; an empty list is rejected locally
    pub async fn bulk_create(&self, session_id: Id, students: &[Id]) -> Result<Vec<AttendanceRecord>> {
        ensure_id(session_id, "차시 ID가 올바르지 않습니다.")?;
        if students.is_empty() {
            return Err(ApiError::InvalidRequest("students 배열이 비어있습니다.".to_string()).into());
        }
        let body = BulkCreateBody {
            session: session_id,
            students,
        };
        let value: serde_json::Value = self
            .client
            .post(&format!("{ATTENDANCE_PATH}bulk_create/"), &body)
            .await?;
        Ok(decode_list(value)?)
    }

    pub async fn matrix(&self, lecture_id: Id) -> Result<AttendanceMatrix> {
        ensure_id(lecture_id, "강의 ID가 올바르지 않습니다.")?;
        Ok(self
            .client
            .get_with_query(
                &format!("{ATTENDANCE_PATH}matrix/"),
                &LectureQuery { lecture: lecture_id },
            )
            .await?)
    }

    /// Download link for the lecture attendance spreadsheet
    pub fn excel_url(&self, lecture_id: Id) -> String {
        format!(
            "{}{ATTENDANCE_PATH}excel/?lecture={lecture_id}",
            self.client.api_root()
        )
    }
}
