//! Lectures and their sessions

use serde::{Deserialize, Serialize};

use super::{ensure_id, Id};
use crate::error::Result;
use crate::http::ApiClient;

const LECTURES_PATH: &str = "/lectures/lectures/";
const SESSIONS_PATH: &str = "/lectures/sessions/";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lecture {
    pub id: Id,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
    #[serde(default)]
    pub lecture_time: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub tenant: Option<Id>,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
}

fn default_true() -> bool {
    true
}

impl Lecture {
    /// Title, falling back to the legacy `name` field
    pub fn display_title(&self) -> &str {
        if self.title.trim().is_empty() {
            &self.name
        } else {
            &self.title
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct LectureFilter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
}

/// Body for create and partial update
#[derive(Debug, Clone, Default, Serialize)]
pub struct LectureInput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lecture_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}

/// One class meeting of a lecture
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: Id,
    pub lecture: Id,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub order: Option<u32>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewSession {
    pub lecture: Id,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<u32>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SessionUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<u32>,
}

#[derive(Debug, Serialize)]
struct SessionQuery {
    lecture: Id,
}

pub struct SessionsApi<'a> {
    client: &'a ApiClient,
}

impl<'a> SessionsApi<'a> {
    pub(crate) fn new(client: &'a ApiClient) -> Self {
        Self { client }
    }

    // ========================================================================
    // Lectures
    // ========================================================================

    pub async fn lectures(&self, filter: &LectureFilter) -> Result<Vec<Lecture>> {
        self.client.get_list(LECTURES_PATH, Some(filter)).await
    }

    pub async fn lecture(&self, lecture_id: Id) -> Result<Lecture> {
        ensure_id(lecture_id, "강의 ID가 올바르지 않습니다.")?;
        Ok(self
            .client
            .get(&format!("{LECTURES_PATH}{lecture_id}/"))
            .await?)
    }

    pub async fn create_lecture(&self, input: &LectureInput) -> Result<Lecture> {
        Ok(self.client.post(LECTURES_PATH, input).await?)
    }

    pub async fn update_lecture(&self, lecture_id: Id, input: &LectureInput) -> Result<Lecture> {
        ensure_id(lecture_id, "강의 ID가 올바르지 않습니다.")?;
        Ok(self
            .client
            .patch(&format!("{LECTURES_PATH}{lecture_id}/"), input)
            .await?)
    }

    pub async fn delete_lecture(&self, lecture_id: Id) -> Result<()> {
        ensure_id(lecture_id, "강의 ID가 올바르지 않습니다.")?;
        Ok(self
            .client
            .delete(&format!("{LECTURES_PATH}{lecture_id}/"))
            .await?)
    }

    // ========================================================================
    // Sessions
    // ========================================================================

    /// Sessions of a lecture, ordered by `order` then date
    pub async fn list(&self, lecture_id: Id) -> Result<Vec<Session>> {
        ensure_id(lecture_id, "강의 ID가 올바르지 않습니다.")?;
        let mut sessions: Vec<Session> = self
            .client
            .get_list(SESSIONS_PATH, Some(&SessionQuery { lecture: lecture_id }))
            .await?;
        sessions.sort_by(|a, b| {
            a.order
                .unwrap_or(u32::MAX)
                .cmp(&b.order.unwrap_or(u32::MAX))
                .then_with(|| a.date.cmp(&b.date))
        });
        Ok(sessions)
    }

    pub async fn get(&self, session_id: Id) -> Result<Session> {
        ensure_id(session_id, "차시 ID가 올바르지 않습니다.")?;
        Ok(self
            .client
            .get(&format!("{SESSIONS_PATH}{session_id}/"))
            .await?)
    }

    pub async fn create(&self, session: &NewSession) -> Result<Session> {
        ensure_id(session.lecture, "강의 ID가 올바르지 않습니다.")?;
        Ok(self.client.post(SESSIONS_PATH, session).await?)
    }

    pub async fn update(&self, session_id: Id, update: &SessionUpdate) -> Result<Session> {
        ensure_id(session_id, "차시 ID가 올바르지 않습니다.")?;
        Ok(self
            .client
            .patch(&format!("{SESSIONS_PATH}{session_id}/"), update)
            .await?)
    }

    pub async fn delete(&self, session_id: Id) -> Result<()> {
        ensure_id(session_id, "차시 ID가 올바르지 않습니다.")?;
        Ok(self
            .client
            .delete(&format!("{SESSIONS_PATH}{session_id}/"))
            .await?)
    }
}
