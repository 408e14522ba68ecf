use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Url;
use std::sync::Arc;
use tracing::debug;

use super::http::{ApiClient, HttpConfig};
use crate::config::{Config, KindEndpoints};
use crate::export::{
    AuthToken, BackendError, ExportAccepted, ExportBackend, ExportFilter, ExportKind, JobId,
    StatusReport,
};

/// [`ExportBackend`] talking to the SIPLAH API for one export kind
pub struct HttpExportBackend {
    kind: ExportKind,
    client: Arc<ApiClient>,
    endpoints: KindEndpoints,
    download_base: Url,
}

impl HttpExportBackend {
    pub fn new(
        kind: ExportKind,
        client: Arc<ApiClient>,
        endpoints: KindEndpoints,
        download_base: &str,
    ) -> Result<Self, BackendError> {
        let download_base = Url::parse(download_base).map_err(|e| {
            BackendError::Request(format!("invalid download base '{}': {}", download_base, e))
        })?;

        Ok(Self {
            kind,
            client,
            endpoints,
            download_base,
        })
    }

    pub fn from_config(
        kind: ExportKind,
        config: &Config,
        token: AuthToken,
    ) -> Result<Self, BackendError> {
        let client = ApiClient::new(&config.api.base_url, token, HttpConfig::from(&config.api))?;

        Self::new(
            kind,
            Arc::new(client),
            config.endpoints(kind),
            config.api.download_base(),
        )
    }

    pub fn kind(&self) -> ExportKind {
        self.kind
    }

    /// Absolute URLs are used as-is; anything else is joined onto the download base
    pub fn resolve_download_url(&self, url: &str) -> Result<Url, BackendError> {
        let url = url.trim();
        if let Ok(absolute) = Url::parse(url) {
            return Ok(absolute);
        }

        self.download_base
            .join(url)
            .map_err(|e| BackendError::InvalidResponse(format!("invalid file URL '{}': {}", url, e)))
    }
}

#[async_trait]
impl ExportBackend for HttpExportBackend {
    async fn start_export(&self, filter: &ExportFilter) -> Result<ExportAccepted, BackendError> {
        debug!(kind = %self.kind, path = %self.endpoints.start_path, "Starting export");
        self.client.post_json(&self.endpoints.start_path, filter).await
    }

    async fn check_status(&self, job_id: &JobId) -> Result<StatusReport, BackendError> {
        let path = self.endpoints.status_path_for(job_id.as_str());
        self.client.get_json(&path).await
    }

    async fn download_file(&self, url: &str, token: &AuthToken) -> Result<Bytes, BackendError> {
        let url = self.resolve_download_url(url)?;
        self.client.download(&url, token).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend(download_base: &str) -> HttpExportBackend {
        let client = ApiClient::new(
            "https://api.siplah.example.test/",
            AuthToken::new("t"),
            HttpConfig::default(),
        )
        .unwrap();

        HttpExportBackend::new(
            ExportKind::Orders,
            Arc::new(client),
            Config::default().endpoints(ExportKind::Orders),
            download_base,
        )
        .unwrap()
    }

    #[test]
    fn test_relative_file_url_uses_download_base() {
        let backend = backend("https://files.siplah.example.test");
        assert_eq!(backend.kind(), ExportKind::Orders);

        assert_eq!(
            backend
                .resolve_download_url("/storage/exports/orders_1.xlsx")
                .unwrap()
                .as_str(),
            "https://files.siplah.example.test/storage/exports/orders_1.xlsx"
        );
    }

    #[test]
    fn test_absolute_file_url_is_kept() {
        let backend = backend("https://files.siplah.example.test");

        assert_eq!(
            backend
                .resolve_download_url("https://cdn.example.test/rekap.xlsx")
                .unwrap()
                .as_str(),
            "https://cdn.example.test/rekap.xlsx"
        );
    }

    #[test]
    fn test_invalid_download_base_is_rejected() {
        let client = ApiClient::new(
            "https://api.siplah.example.test/",
            AuthToken::new("t"),
            HttpConfig::default(),
        )
        .unwrap();

        let result = HttpExportBackend::new(
            ExportKind::Bills,
            Arc::new(client),
            Config::default().endpoints(ExportKind::Bills),
            "not a url",
        );
        assert!(matches!(result, Err(BackendError::Request(_))));
    }
}
