use super::models::Config;
use config::{ConfigError, Environment, File};
use std::env;
use std::path::PathBuf;

const CONFIG_ENV_VAR: &str = "SIPLAH_EXPORT_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "config/siplah-export.toml";
const ENV_PREFIX: &str = "SIPLAH";
const ENV_SEPARATOR: &str = "__";
const TOKEN_ENV_VAR: &str = "SIPLAH_TOKEN";

/// Load configuration from multiple sources with priority:
/// 1. Defaults (embedded in structs)
/// 2. TOML file (if exists)
/// 3. Environment variables from .env file (via dotenvy)
/// 4. System environment variables (highest priority)
pub fn load() -> Result<Config, ConfigError> {
    // Missing .env is fine
    let _ = dotenvy::dotenv();

    let config_path = env::var(CONFIG_ENV_VAR)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH));

    load_with_secrets(config_path)
}

/// Same as [`load`] but with an explicit file path
pub fn load_path(config_path: PathBuf) -> Result<Config, ConfigError> {
    let _ = dotenvy::dotenv();
    load_with_secrets(config_path)
}

fn load_with_secrets(config_path: PathBuf) -> Result<Config, ConfigError> {
    let mut config = load_from_sources(config_path)?;
    load_secrets(&mut config);
    Ok(config)
}

/// The API token only ever comes from the environment
fn load_secrets(config: &mut Config) {
    if let Ok(token) = env::var(TOKEN_ENV_VAR) {
        if !token.trim().is_empty() {
            config.api.token = Some(token.trim().to_string());
        }
    }
}

/// Load configuration from a specific path and environment
pub fn load_from_sources(config_path: PathBuf) -> Result<Config, ConfigError> {
    let mut builder = config::Config::builder();

    if config_path.exists() {
        tracing::info!("Loading configuration from: {}", config_path.display());
        builder = builder.add_source(File::from(config_path).required(false));
    } else {
        tracing::debug!(
            "Configuration file not found at {}, using defaults and environment overrides",
            config_path.display()
        );
    }

    // SIPLAH__EXPORT__POLL_INTERVAL -> export.poll_interval
    builder = builder.add_source(
        Environment::with_prefix(ENV_PREFIX)
            .separator(ENV_SEPARATOR)
            .try_parsing(true),
    );

    let config = builder.build()?;
    config.try_deserialize()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::ExportKind;
    use std::fs;
    use std::time::Duration;
    use tempfile::TempDir;

    #[test]
    fn test_load_defaults_only() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("nonexistent.toml");

        let config = load_from_sources(config_path).unwrap();
        assert_eq!(config.export.poll_interval.as_duration(), Duration::from_secs(2));
        assert!(config.api.token.is_none());
    }

    #[test]
    fn test_load_from_toml() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("test.toml");

        let toml_content = r#"
[api]
base_url = "https://siplah.example.test/api/"
download_base_url = "https://files.example.test"
request_timeout = "30s"

[export]
poll_interval = "3s"
animation_duration = 250
max_poll_duration = "15m"
max_poll_failures = 10

[kinds.bills]
start_path = "tagihan/export"
status_path = "tagihan/export/{job_id}"

[output]
dir = "/tmp/rekap"
        "#;

        fs::write(&config_path, toml_content).unwrap();

        let config = load_from_sources(config_path).unwrap();
        assert_eq!(config.api.base_url, "https://siplah.example.test/api/");
        assert_eq!(config.api.download_base(), "https://files.example.test");
        assert_eq!(config.api.request_timeout.as_duration(), Duration::from_secs(30));
        assert_eq!(config.export.poll_interval.as_duration(), Duration::from_secs(3));
        assert_eq!(config.export.animation_duration.as_duration(), Duration::from_millis(250));
        assert_eq!(
            config.export.max_poll_duration.map(|d| d.as_duration()),
            Some(Duration::from_secs(900))
        );
        assert_eq!(config.export.max_poll_failures, Some(10));

        let bills = config.endpoints(ExportKind::Bills);
        assert_eq!(bills.start_path, "tagihan/export");
        assert_eq!(bills.status_path_for("42"), "tagihan/export/42");
        assert_eq!(config.output.dir, PathBuf::from("/tmp/rekap"));
    }

    #[test]
    fn test_token_is_not_read_from_file() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("test.toml");

        fs::write(&config_path, "[api]\ntoken = \"leaked\"\n").unwrap();

        let config = load_from_sources(config_path).unwrap();
        assert!(config.api.token.is_none());
    }
}
