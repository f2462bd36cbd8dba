//! Unified error handling for the hakwonplus crate
//!
//! This module provides a unified error type that consolidates all domain-specific
//! errors into a single `Error` enum, while maintaining the ability to use
//! domain-specific errors when needed.
//!
//! # Architecture
//!
//! - [`ClientErrorTrait`] - Common interface implemented by all error types
//! - [`ErrorCategory`] - Classification of errors for handling strategies
//! - [`Error`] - Unified error enum wrapping all domain-specific errors
//!
//! # Usage
//!
//! ```rust,ignore
//! use hakwonplus::error::{ClientErrorTrait, Error, ErrorCategory};
//!
//! fn handle_error(err: Error) {
//!     match err.category() {
//!         ErrorCategory::Auth => println!("로그인이 필요합니다"),
//!         _ => eprintln!("{}", err.korean_desc()),
//!     }
//! }
//! ```

use std::io;
use thiserror::Error;

// Re-export domain-specific errors for convenience
pub use crate::http::error::{ApiError, DecodeError};
pub use crate::jobs::error::JobError;
pub use crate::storage::StorageError;
pub use crate::upload::error::UploadError;

/// Common trait for all hakwonplus error types
///
/// This trait provides a unified interface for error handling across
/// all modules, enabling consistent error processing strategies.
pub trait ClientErrorTrait: std::error::Error {
    /// Check if this error is recoverable (the same call may succeed later)
    fn is_recoverable(&self) -> bool;

    /// Korean description for user-facing messages
    fn korean_desc(&self) -> String;

    /// Get the error category for handling strategies
    fn category(&self) -> ErrorCategory;
}

/// Classification of errors for handling strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// 401/403: session cleared, user sent to login
    Auth,
    /// Backend validation or business rule rejection
    Validation,
    /// Network-related errors (connect, timeout)
    Network,
    /// Response body did not match the expected shape
    Decode,
    /// Asynchronous backend job ended in failure or timed out
    Job,
    /// Direct-to-storage upload failures
    Upload,
    /// Configuration and validation errors
    Config,
    /// Local persistent storage errors
    Storage,
    /// Other/unknown errors
    Other,
}

impl ErrorCategory {
    /// Get Korean description for the category
    pub fn korean_desc(&self) -> &'static str {
        match self {
            Self::Auth => "인증 오류",
            Self::Validation => "요청 오류",
            Self::Network => "네트워크 오류",
            Self::Decode => "응답 형식 오류",
            Self::Job => "작업 오류",
            Self::Upload => "업로드 오류",
            Self::Config => "설정 오류",
            Self::Storage => "저장소 오류",
            Self::Other => "기타 오류",
        }
    }
}

/// Unified error type for the hakwonplus crate
#[derive(Error, Debug)]
pub enum Error {
    /// REST API errors
    #[error("API error: {0}")]
    Api(#[from] ApiError),

    /// Response shape errors
    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    /// Job polling errors
    #[error("Job error: {0}")]
    Job(#[from] JobError),

    /// Pre-signed upload errors
    #[error("Upload error: {0}")]
    Upload(#[from] UploadError),

    /// Local storage errors
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration errors
    #[error("Config error: {0}")]
    Config(String),

    /// Generic error with context
    #[error("{context}")]
    Other {
        context: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl ClientErrorTrait for Error {
    fn is_recoverable(&self) -> bool {
        match self {
            Self::Api(e) => e.is_recoverable(),
            Self::Decode(_) => false,
            Self::Job(e) => e.is_recoverable(),
            Self::Upload(e) => e.is_recoverable(),
            Self::Storage(_) => false,
            Self::Io(_) => true,
            Self::Json(_) => false,
            Self::Config(_) => false,
            Self::Other { .. } => false,
        }
    }

    fn korean_desc(&self) -> String {
        match self {
            Self::Api(e) => e.korean_desc(),
            Self::Decode(e) => format!("응답 형식이 올바르지 않습니다: {e}"),
            Self::Job(e) => e.korean_desc(),
            Self::Upload(e) => e.korean_desc(),
            Self::Storage(e) => format!("로컬 저장소 오류: {e}"),
            Self::Io(e) => format!("입출력 오류: {e}"),
            Self::Json(e) => format!("JSON 처리 오류: {e}"),
            Self::Config(msg) => format!("설정 오류: {msg}"),
            Self::Other { context, .. } => context.clone(),
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::Api(e) => e.category(),
            Self::Decode(_) | Self::Json(_) => ErrorCategory::Decode,
            Self::Job(_) => ErrorCategory::Job,
            Self::Upload(_) => ErrorCategory::Upload,
            Self::Storage(_) | Self::Io(_) => ErrorCategory::Storage,
            Self::Config(_) => ErrorCategory::Config,
            Self::Other { .. } => ErrorCategory::Other,
        }
    }
}

impl Error {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a generic error with context
    pub fn other(context: impl Into<String>) -> Self {
        Self::Other {
            context: context.into(),
            source: None,
        }
    }

    /// Create a generic error with context and source
    pub fn with_source(
        context: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Other {
            context: context.into(),
            source: Some(Box::new(source)),
        }
    }

    /// HTTP status code carried by this error, if it came from the backend
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api(e) => e.status(),
            _ => None,
        }
    }

    /// True for 401/403 responses
    pub fn is_auth_failure(&self) -> bool {
        matches!(self.status(), Some(401 | 403))
    }
}

/// Result type alias using the unified Error type
pub type Result<T> = std::result::Result<T, Error>;
