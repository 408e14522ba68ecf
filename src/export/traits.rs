use async_trait::async_trait;
use bytes::Bytes;

use super::error::BackendError;
use super::filter::ExportFilter;
use super::types::{AuthToken, ExportAccepted, JobId, StatusReport};

/// Remote operations the controller drives
///
/// One implementation exists per export kind (orders, payments, bills,
/// provider transactions); the controller itself never knows which.
#[async_trait]
pub trait ExportBackend: Send + Sync {
    /// Submit an export request and return the assigned job id
    async fn start_export(&self, filter: &ExportFilter) -> Result<ExportAccepted, BackendError>;

    /// Fetch the current state of a submitted job
    async fn check_status(&self, job_id: &JobId) -> Result<StatusReport, BackendError>;

    /// Fetch the exported file with an authenticated request
    async fn download_file(&self, url: &str, token: &AuthToken) -> Result<Bytes, BackendError>;
}
