use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

use super::error::JobError;

/// Identifier assigned by the remote system when an export is accepted
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct JobId(String);

impl<'de> Deserialize<'de> for JobId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        // Some endpoints hand out numeric ids
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Text(String),
            Number(u64),
        }

        let id = match RawId::deserialize(deserializer)? {
            RawId::Text(text) => text,
            RawId::Number(number) => number.to_string(),
        };

        if id.trim().is_empty() {
            return Err(serde::de::Error::custom("job id must not be empty"));
        }

        Ok(JobId(id))
    }
}

impl JobId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for JobId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Lifecycle state of an export job as seen by the controller
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportStatus {
    #[default]
    Idle,
    Submitting,
    Queued,
    Processing,
    Completed,
    Failed,
}

impl ExportStatus {
    /// Statuses during which the poll loop is running
    pub fn is_in_progress(self) -> bool {
        matches!(self, ExportStatus::Queued | ExportStatus::Processing)
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, ExportStatus::Completed | ExportStatus::Failed)
    }

    /// Position in the lifecycle; a job never moves to a lower rank without a reset
    fn rank(self) -> u8 {
        match self {
            ExportStatus::Idle => 0,
            ExportStatus::Submitting => 1,
            ExportStatus::Queued => 2,
            ExportStatus::Processing => 3,
            ExportStatus::Completed | ExportStatus::Failed => 4,
        }
    }

    /// Returns the later of the two statuses
    pub(crate) fn advance_to(self, next: ExportStatus) -> ExportStatus {
        if next.rank() >= self.rank() { next } else { self }
    }

    /// Status text shown in the dashboard
    pub fn label(self) -> &'static str {
        match self {
            ExportStatus::Idle => "Menunggu",
            ExportStatus::Submitting => "Mengirim",
            ExportStatus::Queued => "Dalam Antrian",
            ExportStatus::Processing => "Sedang Diproses",
            ExportStatus::Completed => "Selesai",
            ExportStatus::Failed => "Gagal",
        }
    }
}

impl fmt::Display for ExportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ExportStatus::Idle => "idle",
            ExportStatus::Submitting => "submitting",
            ExportStatus::Queued => "queued",
            ExportStatus::Processing => "processing",
            ExportStatus::Completed => "completed",
            ExportStatus::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Status values the remote system is allowed to report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RemoteStatus {
    #[serde(alias = "pending")]
    Queued,
    Processing,
    Completed,
    Failed,
}

impl From<RemoteStatus> for ExportStatus {
    fn from(value: RemoteStatus) -> Self {
        match value {
            RemoteStatus::Queued => ExportStatus::Queued,
            RemoteStatus::Processing => ExportStatus::Processing,
            RemoteStatus::Completed => ExportStatus::Completed,
            RemoteStatus::Failed => ExportStatus::Failed,
        }
    }
}

/// File reference attached to a completed export
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportFile {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub record_count: Option<u64>,
}

/// Data returned when the remote system accepts an export request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportAccepted {
    pub job_id: JobId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<RemoteStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// One status check result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusReport {
    pub status: RemoteStatus,
    /// Percentage as reported; may be fractional or out of range
    #[serde(default)]
    pub progress: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<ExportFile>,
}

impl StatusReport {
    pub fn new(status: RemoteStatus, progress: f64) -> Self {
        Self {
            status,
            progress,
            message: None,
            estimated_time: None,
            file: None,
        }
    }

    pub fn with_file(mut self, file: ExportFile) -> Self {
        self.file = Some(file);
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Progress clamped to 0..=100 and rounded
    pub fn percent(&self) -> u8 {
        if self.progress.is_nan() {
            return 0;
        }
        self.progress.clamp(0.0, 100.0).round() as u8
    }
}

/// Snapshot of the export job owned by the controller
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ExportJob {
    pub job_id: Option<JobId>,
    pub status: ExportStatus,
    /// Last progress reported by the remote system
    pub raw_progress: u8,
    /// Eased progress for display; never authoritative
    pub display_progress: u8,
    pub message: Option<String>,
    pub estimated_time: Option<String>,
    /// Present only once the job is completed
    pub file: Option<ExportFile>,
    pub error: Option<JobError>,
}

impl ExportJob {
    pub(crate) fn submitting() -> Self {
        Self {
            status: ExportStatus::Submitting,
            ..Self::default()
        }
    }

    pub fn is_idle(&self) -> bool {
        *self == Self::default()
    }
}

/// Bytes of a downloaded export together with the name to save it under
#[derive(Debug, Clone)]
pub struct DownloadedFile {
    pub filename: String,
    pub bytes: bytes::Bytes,
    pub record_count: Option<u64>,
}

/// Bearer token for authenticated calls
#[derive(Clone, PartialEq, Eq)]
pub struct AuthToken(String);

impl AuthToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.0)
    }
}

impl fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AuthToken(***)")
    }
}
