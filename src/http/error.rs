//! Error types for the REST client

use crate::error::ErrorCategory;
use thiserror::Error;

/// Errors produced by [`super::ApiClient`]
#[derive(Error, Debug, Clone)]
pub enum ApiError {
    /// Backend answered with a non-2xx status
    #[error("HTTP error ({status}): {message}")]
    Http { status: u16, message: String },

    /// Connection could not be made or was reset
    #[error("Network error: {0}")]
    Network(String),

    /// Request timed out
    #[error("Request timeout")]
    Timeout,

    /// 2xx response whose body did not deserialize into the expected type
    #[error("Invalid response body: {0}")]
    Body(String),

    /// URL could not be built
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// HTTP client could not be constructed
    #[error("Initialization error: {0}")]
    Init(String),

    /// Client-side precondition failed before any request was sent
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl ApiError {
    /// Map a transport error from reqwest
    pub fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_decode() {
            Self::Body(err.to_string())
        } else if err.is_builder() {
            Self::InvalidUrl(err.to_string())
        } else {
            Self::Network(err.to_string())
        }
    }

    /// HTTP status when the backend answered
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether retrying the same call may succeed
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Http { status, .. } => matches!(status, 429 | 500 | 502 | 503 | 504),
            Self::Network(_) | Self::Timeout => true,
            Self::Body(_) | Self::InvalidUrl(_) | Self::Init(_) | Self::InvalidRequest(_) => false,
        }
    }

    /// Classification used by callers and views
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Http { status: 401 | 403, .. } => ErrorCategory::Auth,
            Self::Http { status, .. } if *status < 500 => ErrorCategory::Validation,
            Self::Http { .. } | Self::Network(_) | Self::Timeout => ErrorCategory::Network,
            Self::Body(_) => ErrorCategory::Decode,
            Self::InvalidUrl(_) | Self::Init(_) => ErrorCategory::Config,
            Self::InvalidRequest(_) => ErrorCategory::Validation,
        }
    }

    /// Message suitable for an inline error or toast
    pub fn korean_desc(&self) -> String {
        match self {
            Self::Http { status: 401, .. } => "로그인이 필요합니다.".to_string(),
            Self::Http { status: 403, .. } => "권한이 없습니다.".to_string(),
            Self::Http { status: 404, .. } => "요청한 항목을 찾을 수 없습니다.".to_string(),
            Self::Http { message, .. } if !message.is_empty() => message.clone(),
            Self::Http { status, .. } => format!("요청 처리 중 오류가 발생했습니다. ({status})"),
            Self::Network(_) => "네트워크 연결을 확인해 주세요.".to_string(),
            Self::Timeout => "요청 시간이 초과되었습니다.".to_string(),
            Self::Body(_) => "서버 응답을 해석하지 못했습니다.".to_string(),
            Self::InvalidUrl(url) => format!("잘못된 주소입니다: {url}"),
            Self::Init(msg) => format!("클라이언트 초기화 실패: {msg}"),
            Self::InvalidRequest(msg) => msg.clone(),
        }
    }
}

/// A response body that did not have the shape the caller expected
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// Neither an array nor a known list envelope
    #[error("expected {expected}, found {found}")]
    UnexpectedShape { expected: String, found: String },

    /// A list element failed to deserialize
    #[error("item {index}: {message}")]
    Item { index: usize, message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_categories() {
        let unauthorized = ApiError::Http {
            status: 403,
            message: String::new(),
        };
        assert_eq!(unauthorized.category(), ErrorCategory::Auth);

        let not_found = ApiError::Http {
            status: 404,
            message: String::new(),
        };
        assert_eq!(not_found.category(), ErrorCategory::Validation);
        assert!(!not_found.is_recoverable());

        let unavailable = ApiError::Http {
            status: 503,
            message: String::new(),
        };
        assert_eq!(unavailable.category(), ErrorCategory::Network);
        assert!(unavailable.is_recoverable());
    }

    #[test]
    fn test_backend_message_is_surfaced() {
        let err = ApiError::Http {
            status: 400,
            message: "이미 등록된 학생입니다.".to_string(),
        };
        assert_eq!(err.korean_desc(), "이미 등록된 학생입니다.");
    }
}
