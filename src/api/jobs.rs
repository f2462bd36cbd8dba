//! Job status endpoints

use std::sync::Arc;

use crate::error::Result;
use crate::http::{ApiClient, ApiError};
use crate::jobs::{ApiJobSource, JobEndpoint, JobSnapshot, JobStatusSource};

pub struct JobsApi<'a> {
    client: &'a ApiClient,
}

impl<'a> JobsApi<'a> {
    pub(crate) fn new(client: &'a ApiClient) -> Self {
        Self { client }
    }

    /// One status read, no polling
    pub async fn status(&self, endpoint: JobEndpoint, job_id: &str) -> Result<JobSnapshot> {
        if job_id.trim().is_empty() {
            return Err(ApiError::InvalidRequest("작업 ID가 없습니다.".to_string()).into());
        }
        Ok(self.client.get(&endpoint.path(job_id.trim())).await?)
    }

    /// Status source for the poller
    pub fn source(&self, endpoint: JobEndpoint) -> Arc<dyn JobStatusSource> {
        Arc::new(ApiJobSource::new(self.client.clone(), endpoint))
    }
}
