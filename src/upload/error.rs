//! Pre-signed upload errors

use crate::error::ErrorCategory;
use thiserror::Error;

/// Ways a direct-to-storage PUT can fail
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UploadError {
    /// Storage answered with a non-2xx status
    #[error("R2 업로드 실패: {status} {status_text}")]
    Status { status: u16, status_text: String },

    /// Connection failed or was reset mid-upload
    #[error("R2 업로드 중 네트워크 오류: {0}")]
    Network(String),

    /// No response within the upload timeout
    #[error("R2 업로드 시간 초과")]
    Timeout,

    /// Stopped through the handle
    #[error("R2 업로드가 취소되었습니다")]
    Aborted,
}

impl UploadError {
    pub fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else {
            Self::Network(err.to_string())
        }
    }

    /// HTTP status when storage answered
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Status { status, .. } => *status >= 500,
            Self::Network(_) | Self::Timeout => true,
            Self::Aborted => false,
        }
    }

    pub fn korean_desc(&self) -> String {
        match self {
            // Pre-signed URLs expire; 403 usually means a stale URL or header mismatch
            Self::Status { status: 403, .. } => {
                "업로드 권한이 만료되었습니다. 다시 시도해 주세요.".to_string()
            }
            other => other.to_string(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Network(_) | Self::Timeout => ErrorCategory::Network,
            _ => ErrorCategory::Upload,
        }
    }
}
