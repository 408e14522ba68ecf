use serde::Serialize;
use thiserror::Error;

/// Failure reported by an export collaborator (start, status check, download)
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BackendError {
    #[error("request failed: {0}")]
    Request(String),

    #[error("request timed out")]
    Timeout,

    #[error("unauthorized (HTTP {0})")]
    Unauthorized(u16),

    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("invalid filter: {0}")]
    InvalidFilter(String),
}

impl BackendError {
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, BackendError::Unauthorized(_))
    }
}

/// Errors returned from controller operations
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("export submission failed: {0}")]
    Submission(BackendError),

    #[error("no exported file available for download")]
    NoFileAvailable,

    #[error("file download failed: {0}")]
    Download(BackendError),

    #[error("export request was superseded before it was accepted")]
    Superseded,
}

/// Error recorded on the job snapshot for the presentation layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum JobError {
    Submission { reason: String, unauthorized: bool },
    RemoteFailure { message: Option<String> },
    Timeout { reason: String },
    StatusCheck { reason: String, unauthorized: bool },
    NoFileAvailable,
    Download { reason: String, unauthorized: bool },
}

impl JobError {
    pub(crate) fn submission(err: &BackendError) -> Self {
        JobError::Submission {
            reason: err.to_string(),
            unauthorized: err.is_unauthorized(),
        }
    }

    pub(crate) fn status_check(err: &BackendError) -> Self {
        JobError::StatusCheck {
            reason: err.to_string(),
            unauthorized: err.is_unauthorized(),
        }
    }

    pub(crate) fn download(err: &BackendError) -> Self {
        JobError::Download {
            reason: err.to_string(),
            unauthorized: err.is_unauthorized(),
        }
    }

    /// Actionable message for the person running the export
    pub fn user_message(&self) -> String {
        const SESSION_EXPIRED: &str = "Sesi Anda telah berakhir. Silakan login kembali.";

        match self {
            JobError::Submission { unauthorized: true, .. }
            | JobError::StatusCheck { unauthorized: true, .. }
            | JobError::Download { unauthorized: true, .. } => SESSION_EXPIRED.to_string(),
            JobError::Submission { .. } => "Gagal memulai export. Silakan coba lagi.".to_string(),
            JobError::RemoteFailure { message } => {
                let base = "Export gagal. Silakan coba lagi atau hubungi tim support.";
                match message {
                    Some(msg) if !msg.trim().is_empty() => format!("{} ({})", base, msg.trim()),
                    _ => base.to_string(),
                }
            }
            JobError::Timeout { .. } => {
                "Export tidak selesai tepat waktu. Silakan coba lagi.".to_string()
            }
            JobError::StatusCheck { .. } => {
                "Gagal memeriksa status export. Silakan coba lagi.".to_string()
            }
            JobError::NoFileAvailable => {
                "File tidak tersedia pada response. Silakan coba lagi atau hubungi tim IT."
                    .to_string()
            }
            JobError::Download { .. } => "Terjadi kesalahan saat mengunduh file.".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_failure_includes_remote_message() {
        let err = JobError::RemoteFailure {
            message: Some("Query timeout".to_string()),
        };
        assert!(err.user_message().ends_with("(Query timeout)"));

        let bare = JobError::RemoteFailure { message: None };
        assert_eq!(
            bare.user_message(),
            "Export gagal. Silakan coba lagi atau hubungi tim support."
        );
    }

    #[test]
    fn test_unauthorized_asks_for_login() {
        let err = JobError::download(&BackendError::Unauthorized(401));
        assert!(err.user_message().contains("login"));

        let err = JobError::download(&BackendError::Http {
            status: 500,
            message: "boom".to_string(),
        });
        assert_eq!(err.user_message(), "Terjadi kesalahan saat mengunduh file.");
    }

    #[test]
    fn test_rejected_status_check_asks_for_login() {
        let err = JobError::status_check(&BackendError::Unauthorized(403));
        assert_eq!(
            err,
            JobError::StatusCheck {
                reason: "unauthorized (HTTP 403)".to_string(),
                unauthorized: true,
            }
        );
        assert_eq!(
            err.user_message(),
            "Sesi Anda telah berakhir. Silakan login kembali."
        );

        let value = serde_json::to_value(&err).unwrap();
        assert_eq!(value["kind"], "status_check");
        assert_eq!(value["unauthorized"], true);
    }

    #[test]
    fn test_serializes_with_kind_tag() {
        let value = serde_json::to_value(JobError::NoFileAvailable).unwrap();
        assert_eq!(value["kind"], "no_file_available");
    }
}
