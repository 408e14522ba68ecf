use crate::export::{ControllerOptions, ExportKind};
use crate::humanize::HumanDuration;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Top-level configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub export: ExportSettings,
    #[serde(default)]
    pub kinds: BTreeMap<ExportKind, KindConfig>,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Remote API connection
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Prefix for server-relative file URLs (defaults to `base_url`)
    pub download_base_url: Option<String>,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout: HumanDuration,
    #[serde(default = "default_request_timeout")]
    pub request_timeout: HumanDuration,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Attempts per file download (server errors and connection failures only)
    #[serde(default = "default_download_attempts")]
    pub download_attempts: u32,
    /// Bearer token (loaded from environment, not from config file)
    #[serde(skip)]
    pub token: Option<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            download_base_url: None,
            connect_timeout: default_connect_timeout(),
            request_timeout: default_request_timeout(),
            user_agent: default_user_agent(),
            download_attempts: default_download_attempts(),
            token: None,
        }
    }
}

impl ApiConfig {
    pub fn download_base(&self) -> &str {
        self.download_base_url.as_deref().unwrap_or(&self.base_url)
    }
}

fn default_base_url() -> String {
    "https://api.siplah.dashboard.eurekagroup.id/".to_string()
}

fn default_connect_timeout() -> HumanDuration {
    HumanDuration::from_millis(10_000)
}

fn default_request_timeout() -> HumanDuration {
    HumanDuration::from_millis(60_000)
}

fn default_download_attempts() -> u32 {
    3
}

fn default_user_agent() -> String {
    format!("siplah-export/{}", env!("CARGO_PKG_VERSION"))
}

/// Polling and progress timing
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ExportSettings {
    #[serde(default = "default_poll_interval")]
    pub poll_interval: HumanDuration,
    #[serde(default = "default_animation_duration")]
    pub animation_duration: HumanDuration,
    #[serde(default = "default_frame_interval")]
    pub frame_interval: HumanDuration,
    pub max_poll_duration: Option<HumanDuration>,
    pub max_poll_failures: Option<u32>,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            poll_interval: default_poll_interval(),
            animation_duration: default_animation_duration(),
            frame_interval: default_frame_interval(),
            max_poll_duration: None,
            max_poll_failures: None,
        }
    }
}

impl ExportSettings {
    pub fn controller_options(&self) -> ControllerOptions {
        ControllerOptions {
            poll_interval: self.poll_interval.into(),
            animation_duration: self.animation_duration.into(),
            frame_interval: self.frame_interval.into(),
            max_poll_duration: self.max_poll_duration.map(Into::into),
            max_poll_failures: self.max_poll_failures,
        }
    }
}

fn default_poll_interval() -> HumanDuration {
    HumanDuration::from_millis(2000)
}

fn default_animation_duration() -> HumanDuration {
    HumanDuration::from_millis(500)
}

fn default_frame_interval() -> HumanDuration {
    HumanDuration::from_millis(16)
}

/// Per-kind endpoint overrides
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct KindConfig {
    pub start_path: Option<String>,
    /// Must contain `{job_id}`
    pub status_path: Option<String>,
}

/// Resolved endpoints for one export kind
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KindEndpoints {
    pub start_path: String,
    pub status_path: String,
}

impl KindEndpoints {
    pub fn status_path_for(&self, job_id: &str) -> String {
        self.status_path.replace("{job_id}", job_id)
    }
}

/// Where downloaded files are written
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OutputConfig {
    #[serde(default = "default_output_dir")]
    pub dir: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
        }
    }
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("exports")
}

impl Config {
    pub fn endpoints(&self, kind: ExportKind) -> KindEndpoints {
        let overrides = self.kinds.get(&kind);

        KindEndpoints {
            start_path: overrides
                .and_then(|k| k.start_path.clone())
                .unwrap_or_else(|| kind.default_start_path()),
            status_path: overrides
                .and_then(|k| k.status_path.clone())
                .unwrap_or_else(|| kind.default_status_path()),
        }
    }
}
