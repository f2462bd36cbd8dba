//! Job polling errors

use crate::error::ErrorCategory;
use crate::http::ApiError;
use thiserror::Error;

/// Message used when a failed job carries none
pub const DEFAULT_FAILURE_MESSAGE: &str = "작업이 실패했습니다.";

/// Ways a polled job can end without a result
#[derive(Error, Debug)]
pub enum JobError {
    /// Job reached `FAILED`; carries the server message
    #[error("{0}")]
    Failed(String),

    /// Attempt budget exhausted before a terminal status
    #[error("job did not finish after {attempts} attempts")]
    Timeout { attempts: u32 },

    /// Poller stopped through its handle
    #[error("job polling cancelled")]
    Cancelled,

    /// Status request failed
    #[error("status request failed: {0}")]
    Api(#[from] ApiError),

    /// Polling task died unexpectedly
    #[error("polling task panicked: {0}")]
    Panicked(String),
}

impl JobError {
    /// Build a failure from an optional server message
    pub fn failed(message: Option<&str>) -> Self {
        let message = message
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .unwrap_or(DEFAULT_FAILURE_MESSAGE);
        Self::Failed(message.to_string())
    }

    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Timeout { .. } => true,
            Self::Api(e) => e.is_recoverable(),
            Self::Failed(_) | Self::Cancelled | Self::Panicked(_) => false,
        }
    }

    pub fn korean_desc(&self) -> String {
        match self {
            Self::Failed(message) => message.clone(),
            Self::Timeout { .. } => "작업 시간이 초과되었습니다. 잠시 후 다시 확인해 주세요.".to_string(),
            Self::Cancelled => "작업 확인이 취소되었습니다.".to_string(),
            Self::Api(e) => e.korean_desc(),
            Self::Panicked(_) => "작업 상태 확인 중 오류가 발생했습니다.".to_string(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Api(e) => e.category(),
            _ => ErrorCategory::Job,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failed_message_default() {
        assert_eq!(JobError::failed(None).to_string(), DEFAULT_FAILURE_MESSAGE);
        assert_eq!(JobError::failed(Some("  ")).to_string(), DEFAULT_FAILURE_MESSAGE);
        assert_eq!(JobError::failed(Some("x")).to_string(), "x");
    }

    #[test]
    fn test_timeout_is_recoverable() {
        assert!(JobError::Timeout { attempts: 120 }.is_recoverable());
        assert!(!JobError::Cancelled.is_recoverable());
        assert_eq!(JobError::Cancelled.category(), ErrorCategory::Job);
    }
}
