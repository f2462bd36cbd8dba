//! Messaging: sender settings, credit, templates, send, and the send log

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{ensure_id, Id};
use crate::error::Result;
use crate::http::{ApiClient, ApiError, Page};

const MESSAGING_PATH: &str = "/messaging/";

/// Tenant messaging account
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MessagingInfo {
    pub kakao_pfid: Option<String>,
    pub messaging_sender: Option<String>,
    /// Decimal string as sent by the backend
    pub credit_balance: String,
    pub is_active: bool,
    pub base_price: Option<String>,
}

impl MessagingInfo {
    pub fn credit(&self) -> f64 {
        self.credit_balance.trim().parse().unwrap_or(0.0)
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct MessagingInfoUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kakao_pfid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub messaging_sender: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VerifySenderResult {
    pub verified: bool,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemplateCategory {
    Default,
    Lecture,
    Clinic,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageTemplate {
    pub id: Id,
    #[serde(default)]
    pub category: Option<TemplateCategory>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub solapi_status: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct TemplateInput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<TemplateCategory>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SendTo {
    Student,
    Parent,
}

/// Either a template or a raw body must be given
#[derive(Debug, Clone, Serialize)]
pub struct SendRequest {
    pub student_ids: Vec<Id>,
    pub send_to: SendTo,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template_id: Option<Id>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_body: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_subject: Option<String>,
}

impl SendRequest {
    fn validate(&self) -> std::result::Result<(), ApiError> {
        if self.student_ids.is_empty() {
            return Err(ApiError::InvalidRequest("받는 학생을 선택해 주세요.".to_string()));
        }
        let has_body = self
            .raw_body
            .as_deref()
            .is_some_and(|b| !b.trim().is_empty());
        if self.template_id.is_none() && !has_body {
            return Err(ApiError::InvalidRequest("템플릿 또는 내용을 입력해 주세요.".to_string()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SendResult {
    pub detail: String,
    pub enqueued: u32,
    pub skipped_no_phone: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationLogItem {
    pub id: Id,
    #[serde(default)]
    pub sent_at: Option<String>,
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub amount_deducted: Option<String>,
    #[serde(default)]
    pub recipient_summary: Option<String>,
    #[serde(default)]
    pub template_summary: Option<String>,
    #[serde(default)]
    pub failure_reason: Option<String>,
}

#[derive(Debug, Serialize)]
struct PageQuery {
    page: u32,
    page_size: u32,
}

#[derive(Debug, Serialize)]
struct CategoryQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    category: Option<TemplateCategory>,
}

#[derive(Debug, Serialize)]
struct ChargeBody {
    amount: u64,
}

#[derive(Debug, Serialize)]
struct VerifySenderBody<'a> {
    phone_number: &'a str,
}

pub struct MessagesApi<'a> {
    client: &'a ApiClient,
}

impl<'a> MessagesApi<'a> {
    pub(crate) fn new(client: &'a ApiClient) -> Self {
        Self { client }
    }

    fn path(suffix: &str) -> String {
        format!("{MESSAGING_PATH}{suffix}")
    }

    pub async fn info(&self) -> Result<MessagingInfo> {
        Ok(self.client.get(&Self::path("info/")).await?)
    }

    pub async fn update_info(&self, update: &MessagingInfoUpdate) -> Result<MessagingInfo> {
        Ok(self.client.patch(&Self::path("info/"), update).await?)
    }

    pub async fn update_kakao_pfid(&self, pfid: &str) -> Result<MessagingInfo> {
        let update = MessagingInfoUpdate {
            kakao_pfid: Some(pfid.trim().to_string()),
            ..MessagingInfoUpdate::default()
        };
        self.update_info(&update).await
    }

    pub async fn charge(&self, amount: u64) -> Result<Value> {
        if amount == 0 {
            return Err(ApiError::InvalidRequest("충전 금액을 입력해 주세요.".to_string()).into());
        }
        Ok(self
            .client
            .post(&Self::path("charge/"), &ChargeBody { amount })
            .await?)
    }

    pub async fn verify_sender(&self, phone_number: &str) -> Result<VerifySenderResult> {
        let digits: String = phone_number.chars().filter(char::is_ascii_digit).collect();
        if digits.is_empty() {
            return Err(ApiError::InvalidRequest("발신번호를 입력해 주세요.".to_string()).into());
        }
        Ok(self
            .client
            .post(
                &Self::path("verify-sender/"),
                &VerifySenderBody {
                    phone_number: &digits,
                },
            )
            .await?)
    }

    pub async fn channel_check(&self) -> Result<Value> {
        Ok(self.client.get(&Self::path("channel-check/")).await?)
    }

    pub async fn log(&self, page: u32, page_size: u32) -> Result<Page<NotificationLogItem>> {
        Ok(self
            .client
            .get_with_query(
                &Self::path("log/"),
                &PageQuery {
                    page: page.max(1),
                    page_size: page_size.max(1),
                },
            )
            .await?)
    }

    pub async fn templates(&self, category: Option<TemplateCategory>) -> Result<Vec<MessageTemplate>> {
        self.client
            .get_list(&Self::path("templates/"), Some(&CategoryQuery { category }))
            .await
    }

    pub async fn create_template(&self, input: &TemplateInput) -> Result<MessageTemplate> {
        Ok(self.client.post(&Self::path("templates/"), input).await?)
    }

    pub async fn update_template(&self, template_id: Id, input: &TemplateInput) -> Result<MessageTemplate> {
        ensure_id(template_id, "템플릿 ID가 올바르지 않습니다.")?;
        Ok(self
            .client
            .patch(&Self::path(&format!("templates/{template_id}/")), input)
            .await?)
    }

    pub async fn delete_template(&self, template_id: Id) -> Result<()> {
        ensure_id(template_id, "템플릿 ID가 올바르지 않습니다.")?;
        Ok(self
            .client
            .delete(&Self::path(&format!("templates/{template_id}/")))
            .await?)
    }

    /// Submit a template for provider (Kakao) review
    pub async fn submit_review(&self, template_id: Id) -> Result<Value> {
        ensure_id(template_id, "템플릿 ID가 올바르지 않습니다.")?;
        Ok(self
            .client
            .post_empty(&Self::path(&format!("templates/{template_id}/submit-review/")))
            .await?)
    }

    pub async fn send(&self, request: &SendRequest) -> Result<SendResult> {
        request.validate()?;
        let result: SendResult = self.client.post(&Self::path("send/"), request).await?;
        tracing::info!(
            enqueued = result.enqueued,
            skipped_no_phone = result.skipped_no_phone,
            "Messages enqueued"
        );
        Ok(result)
    }
}
