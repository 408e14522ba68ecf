//! HTTP client for the SIPLAH back-office API

use bytes::Bytes;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, RequestBuilder, Response, StatusCode, Url};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::ApiConfig;
use crate::export::{AuthToken, BackendError};

pub type Result<T> = std::result::Result<T, BackendError>;

/// HTTP client configuration
#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    /// Attempts per file download, including the first
    pub max_retries: u32,
    /// Delay before the first retry; doubles on every further attempt
    pub retry_backoff: Duration,
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(60),
            max_retries: 3,
            retry_backoff: Duration::from_secs(1),
            user_agent: format!("siplah-export/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl From<&ApiConfig> for HttpConfig {
    fn from(api: &ApiConfig) -> Self {
        Self {
            connect_timeout: api.connect_timeout.into(),
            request_timeout: api.request_timeout.into(),
            max_retries: api.download_attempts.max(1),
            user_agent: api.user_agent.clone(),
            ..Self::default()
        }
    }
}

/// Response wrapper used by every API endpoint
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: Option<T>,
    #[serde(default)]
    message: Option<String>,
}

/// Error body shape; `data` is ignored
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
}

/// Authenticated JSON client bound to one API base URL
pub struct ApiClient {
    client: Client,
    config: HttpConfig,
    base_url: Url,
    token: AuthToken,
}

impl ApiClient {
    pub fn new(base_url: &str, token: AuthToken, config: HttpConfig) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .user_agent(&config.user_agent)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .map_err(|e| BackendError::Request(e.to_string()))?;

        Ok(Self {
            client,
            config,
            base_url: normalize_base(base_url)?,
            token,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Resolve an endpoint path against the base URL
    pub fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| BackendError::Request(format!("invalid endpoint '{}': {}", path, e)))
    }

    /// POST a JSON body and unwrap the `data` of the response envelope
    pub async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: serde::Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.endpoint(path)?;
        let payload =
            serde_json::to_vec(body).map_err(|e| BackendError::InvalidFilter(e.to_string()))?;

        debug!(%url, size = payload.len(), "POST");

        let request = self
            .client
            .post(url)
            .header(CONTENT_TYPE, mime::APPLICATION_JSON.as_ref())
            .body(payload);

        self.send_json(request).await
    }

    /// GET an endpoint and unwrap the `data` of the response envelope
    pub async fn get_json<T>(&self, path: &str) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let url = self.endpoint(path)?;
        debug!(%url, "GET");
        self.send_json(self.client.get(url)).await
    }

    async fn send_json<T>(&self, request: RequestBuilder) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let response = request
            .header(AUTHORIZATION, self.token.bearer())
            .send()
            .await
            .map_err(map_send_error)?;

        let response = check_status(response).await?;
        let body = response
            .bytes()
            .await
            .map_err(|e| BackendError::Request(format!("Failed to read body: {}", e)))?;

        let envelope: Envelope<T> = serde_json::from_slice(&body)
            .map_err(|e| BackendError::InvalidResponse(e.to_string()))?;

        envelope.data.ok_or_else(|| {
            BackendError::InvalidResponse(
                envelope
                    .message
                    .unwrap_or_else(|| "response has no data".to_string()),
            )
        })
    }

    /// Download a file with retry
    ///
    /// Only connection failures, timeouts and server errors are retried;
    /// authorization and other client errors fail immediately.
    pub async fn download(&self, url: &Url, token: &AuthToken) -> Result<Bytes> {
        let mut attempts = 0;

        loop {
            attempts += 1;

            match self.download_once(url, token).await {
                Ok(bytes) => {
                    if attempts > 1 {
                        debug!(%url, attempts, "Download succeeded after retry");
                    }
                    return Ok(bytes);
                }
                Err(e) if is_retryable(&e) && attempts < self.config.max_retries => {
                    warn!(%url, attempts, error = %e, "Download failed, retrying");

                    // Exponential backoff: 1x, 2x, 4x
                    let backoff = self.config.retry_backoff * 2u32.pow(attempts - 1);
                    tokio::time::sleep(backoff).await;
                }
                Err(e) => {
                    warn!(%url, attempts, error = %e, "Download failed");
                    return Err(e);
                }
            }
        }
    }

    /// Download once (no retry)
    async fn download_once(&self, url: &Url, token: &AuthToken) -> Result<Bytes> {
        debug!(%url, "Starting download");

        let response = self
            .client
            .get(url.clone())
            .header(AUTHORIZATION, token.bearer())
            .send()
            .await
            .map_err(map_send_error)?;

        let response = check_status(response).await?;

        // A JSON body in place of the file is an error envelope
        if is_json(&response) {
            let status = response.status().as_u16();
            let body = response.bytes().await.unwrap_or_default();
            let message = serde_json::from_slice::<ErrorBody>(&body)
                .ok()
                .and_then(|b| b.message)
                .unwrap_or_else(|| "server returned JSON instead of a file".to_string());
            return Err(BackendError::Http { status, message });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| BackendError::Request(format!("Failed to read body: {}", e)))?;

        debug!(%url, size = bytes.len(), "Download completed");

        Ok(bytes)
    }
}

fn normalize_base(base_url: &str) -> Result<Url> {
    let mut base = base_url.trim().to_string();
    if !base.ends_with('/') {
        base.push('/');
    }
    Url::parse(&base).map_err(|e| BackendError::Request(format!("invalid base URL '{}': {}", base_url, e)))
}

fn map_send_error(e: reqwest::Error) -> BackendError {
    if e.is_timeout() {
        BackendError::Timeout
    } else {
        BackendError::Request(e.to_string())
    }
}

/// Turn non-success responses into errors, keeping the server's message
async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
        return Err(BackendError::Unauthorized(status.as_u16()));
    }

    let body = response.bytes().await.unwrap_or_default();
    let message = serde_json::from_slice::<ErrorBody>(&body)
        .ok()
        .and_then(|b| b.message)
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("Unknown").to_string());

    Err(BackendError::Http {
        status: status.as_u16(),
        message,
    })
}

fn is_json(response: &Response) -> bool {
    response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse::<mime::Mime>().ok())
        .is_some_and(|m| m.subtype() == mime::JSON || m.suffix() == Some(mime::JSON))
}

fn is_retryable(err: &BackendError) -> bool {
    match err {
        BackendError::Request(_) | BackendError::Timeout => true,
        BackendError::Http { status, .. } => *status >= 500,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_config_defaults() {
        let config = HttpConfig::default();
        assert_eq!(config.connect_timeout, Duration::from_secs(10));
        assert_eq!(config.request_timeout, Duration::from_secs(60));
        assert_eq!(config.max_retries, 3);
        assert!(config.user_agent.starts_with("siplah-export/"));
    }

    #[test]
    fn test_http_config_from_api_config() {
        let api = ApiConfig {
            download_attempts: 0,
            ..ApiConfig::default()
        };

        let config = HttpConfig::from(&api);
        assert_eq!(config.max_retries, 1);
        assert_eq!(config.request_timeout, Duration::from_secs(60));
    }

    #[test]
    fn test_endpoint_keeps_base_path() {
        let client = ApiClient::new(
            "https://siplah.example.test/api",
            AuthToken::new("t"),
            HttpConfig::default(),
        )
        .unwrap();

        assert_eq!(client.base_url().as_str(), "https://siplah.example.test/api/");
        assert_eq!(
            client.endpoint("/orders/export").unwrap().as_str(),
            "https://siplah.example.test/api/orders/export"
        );
    }

    #[test]
    fn test_retryable_errors() {
        assert!(is_retryable(&BackendError::Timeout));
        assert!(is_retryable(&BackendError::Http {
            status: 502,
            message: "Bad Gateway".to_string()
        }));
        assert!(!is_retryable(&BackendError::Http {
            status: 404,
            message: "Not Found".to_string()
        }));
        assert!(!is_retryable(&BackendError::Unauthorized(401)));
    }
}
