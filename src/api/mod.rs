//! Feature API modules
//!
//! One borrowing wrapper per business entity, reached from the shared client:
//!
//! ```rust,ignore
//! let exams = client.exams().list(None).await?;
//! let result = client.exams().my_result(42).await?;
//! ```
//!
//! Each wrapper hard-codes its path segment and goes through [`ApiClient`] so
//! tenant and auth headers are always applied. List endpoints decode through
//! [`crate::http::decode_list`].

pub mod attendance;
pub mod branding;
pub mod exams;
pub mod jobs;
pub mod messages;
pub mod sessions;
pub mod submissions;
pub mod videos;

use serde::Serialize;

use crate::http::{ApiClient, ApiError};

pub use attendance::AttendanceApi;
pub use branding::BrandingApi;
pub use exams::ExamsApi;
pub use jobs::JobsApi;
pub use messages::MessagesApi;
pub use sessions::SessionsApi;
pub use submissions::SubmissionsApi;
pub use videos::VideosApi;

/// Backend primary key
pub type Id = u64;

impl ApiClient {
    pub fn exams(&self) -> ExamsApi<'_> {
        ExamsApi::new(self)
    }

    pub fn submissions(&self) -> SubmissionsApi<'_> {
        SubmissionsApi::new(self)
    }

    pub fn sessions(&self) -> SessionsApi<'_> {
        SessionsApi::new(self)
    }

    pub fn videos(&self) -> VideosApi<'_> {
        VideosApi::new(self)
    }

    pub fn attendance(&self) -> AttendanceApi<'_> {
        AttendanceApi::new(self)
    }

    pub fn messages(&self) -> MessagesApi<'_> {
        MessagesApi::new(self)
    }

    pub fn branding(&self) -> BrandingApi<'_> {
        BrandingApi::new(self)
    }

    pub fn jobs(&self) -> JobsApi<'_> {
        JobsApi::new(self)
    }
}

/// Query string with no parameters
#[derive(Debug, Default, Serialize)]
pub(crate) struct NoQuery {}

/// Reject ids the backend can never have
pub(crate) fn ensure_id(id: Id, message: &str) -> Result<(), ApiError> {
    if id == 0 {
        Err(ApiError::InvalidRequest(message.to_string()))
    } else {
        Ok(())
    }
}
