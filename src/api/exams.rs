//! Exams and exam results

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{ensure_id, Id};
use crate::error::Result;
use crate::http::ApiClient;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExamType {
    Template,
    Regular,
}

/// Exam as listed and edited by operators
///
/// Some endpoints send `exam_id` instead of `id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exam {
    #[serde(alias = "exam_id")]
    pub id: Id,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub subject: String,
    pub exam_type: Option<ExamType>,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default)]
    pub allow_retake: bool,
    #[serde(default)]
    pub max_attempts: u32,
    #[serde(default)]
    pub pass_score: f64,
    #[serde(default)]
    pub open_at: Option<String>,
    #[serde(default)]
    pub close_at: Option<String>,
    #[serde(default)]
    pub template_exam_id: Option<Id>,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
}

#[derive(Debug, Serialize)]
struct ExamListQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    exam_type: Option<ExamType>,
}

/// New template exam
#[derive(Debug, Clone, Serialize)]
pub struct NewTemplateExam {
    pub title: String,
    pub subject: String,
    #[serde(default)]
    pub description: String,
}

/// New regular exam created from a template
#[derive(Debug, Clone, Serialize)]
pub struct NewRegularExam {
    pub title: String,
    pub template_exam_id: Id,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Serialize)]
struct CreateExamBody<'a> {
    title: &'a str,
    description: &'a str,
    exam_type: ExamType,
    #[serde(skip_serializing_if = "Option::is_none")]
    subject: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    template_exam_id: Option<Id>,
}

/// Partial exam update
#[derive(Debug, Clone, Default, Serialize)]
pub struct ExamUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allow_retake: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_attempts: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pass_score: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub open_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub close_at: Option<String>,
}

// ============================================================================
// Results
// ============================================================================

/// Per-question row of a student result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultItem {
    pub question_id: Id,
    #[serde(default)]
    pub question_number: Option<u32>,
    #[serde(default, alias = "answer")]
    pub student_answer: Option<String>,
    #[serde(default)]
    pub correct_answer: Option<String>,
    #[serde(default)]
    pub is_correct: bool,
    #[serde(default)]
    pub score: f64,
    #[serde(default)]
    pub max_score: f64,
    #[serde(default)]
    pub source: Option<String>,
}

/// A student's own exam result; `can_retake` is the only retake authority
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentExamResult {
    #[serde(default)]
    pub target_type: Option<String>,
    #[serde(default, alias = "exam_id")]
    pub target_id: Option<Id>,
    #[serde(default)]
    pub enrollment_id: Option<Id>,
    #[serde(default)]
    pub attempt_id: Option<Id>,
    pub total_score: f64,
    pub max_score: f64,
    #[serde(default)]
    pub is_pass: Option<bool>,
    #[serde(default)]
    pub submitted_at: Option<String>,
    #[serde(default)]
    pub items: Vec<ResultItem>,
    #[serde(default)]
    pub allow_retake: Option<bool>,
    #[serde(default)]
    pub max_attempts: Option<u32>,
    #[serde(default)]
    pub can_retake: Option<bool>,
    #[serde(default)]
    pub clinic_required: Option<bool>,
}

/// One row of the operator result list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdminExamResultRow {
    pub enrollment_id: Id,
    #[serde(default)]
    pub student_name: String,
    #[serde(default)]
    pub final_score: Option<f64>,
    #[serde(default)]
    pub passed: Option<bool>,
    #[serde(default)]
    pub clinic_required: Option<bool>,
    #[serde(default)]
    pub submission_status: Option<String>,
    #[serde(default)]
    pub submitted_at: Option<String>,
    #[serde(default)]
    pub submission_id: Option<Id>,
}

/// Score statistics for one exam
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdminExamSummary {
    pub participant_count: u32,
    pub avg_score: f64,
    pub min_score: f64,
    pub max_score: f64,
    pub pass_count: u32,
    pub fail_count: u32,
    pub pass_rate: f64,
    pub clinic_count: u32,
}

pub struct ExamsApi<'a> {
    client: &'a ApiClient,
}

impl<'a> ExamsApi<'a> {
    pub(crate) fn new(client: &'a ApiClient) -> Self {
        Self { client }
    }

    /// `GET /exams/`
    pub async fn list(&self, exam_type: Option<ExamType>) -> Result<Vec<Exam>> {
        self.client
            .get_list("/exams/", Some(&ExamListQuery { exam_type }))
            .await
    }

    /// `GET /exams/{id}/`
    pub async fn get(&self, exam_id: Id) -> Result<Exam> {
        ensure_id(exam_id, "시험 ID가 올바르지 않습니다.")?;
        Ok(self.client.get(&format!("/exams/{exam_id}/")).await?)
    }

    /// `POST /exams/` with `exam_type: template`
    pub async fn create_template(&self, exam: &NewTemplateExam) -> Result<Exam> {
        let body = CreateExamBody {
            title: &exam.title,
            description: &exam.description,
            exam_type: ExamType::Template,
            subject: Some(&exam.subject),
            template_exam_id: None,
        };
        Ok(self.client.post("/exams/", &body).await?)
    }

    /// `POST /exams/` with `exam_type: regular`
    pub async fn create_regular(&self, exam: &NewRegularExam) -> Result<Exam> {
        let body = CreateExamBody {
            title: &exam.title,
            description: &exam.description,
            exam_type: ExamType::Regular,
            subject: None,
            template_exam_id: Some(exam.template_exam_id),
        };
        Ok(self.client.post("/exams/", &body).await?)
    }

    /// `PATCH /exams/{id}/`
    pub async fn update(&self, exam_id: Id, update: &ExamUpdate) -> Result<Exam> {
        ensure_id(exam_id, "시험 ID가 올바르지 않습니다.")?;
        Ok(self.client.patch(&format!("/exams/{exam_id}/"), update).await?)
    }

    /// `GET /results/me/exams/{id}/`
    pub async fn my_result(&self, exam_id: Id) -> Result<StudentExamResult> {
        ensure_id(exam_id, "시험 ID가 올바르지 않습니다.")?;
        Ok(self
            .client
            .get(&format!("/results/me/exams/{exam_id}/"))
            .await?)
    }

    /// `GET /results/admin/exams/{id}/results/`
    pub async fn results(&self, exam_id: Id) -> Result<Vec<AdminExamResultRow>> {
        ensure_id(exam_id, "시험 ID가 올바르지 않습니다.")?;
        self.client
            .get_list::<_, super::NoQuery>(&format!("/results/admin/exams/{exam_id}/results/"), None)
            .await
    }

    /// `GET /results/admin/exams/{id}/summary/`
    pub async fn summary(&self, exam_id: Id) -> Result<AdminExamSummary> {
        ensure_id(exam_id, "시험 ID가 올바르지 않습니다.")?;
        Ok(self
            .client
            .get(&format!("/results/admin/exams/{exam_id}/summary/"))
            .await?)
    }

    /// `GET /results/admin/exams/{id}/questions/`, shape varies by exam kind
    pub async fn question_stats(&self, exam_id: Id) -> Result<Value> {
        ensure_id(exam_id, "시험 ID가 올바르지 않습니다.")?;
        Ok(self
            .client
            .get(&format!("/results/admin/exams/{exam_id}/questions/"))
            .await?)
    }
}
