use super::models::Config;
use crate::export::ExportKind;
use reqwest::Url;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Invalid {field} '{value}': expected an absolute http(s) URL")]
    InvalidUrl { field: String, value: String },

    #[error("{field} must be greater than zero")]
    ZeroDuration { field: String },

    #[error("max_poll_failures must be at least 1 when set")]
    ZeroPollFailures,

    #[error("Status path for '{kind}' must contain '{{job_id}}': {path}")]
    MissingJobIdPlaceholder { kind: ExportKind, path: String },

    #[error("Start path for '{kind}' must not be empty")]
    EmptyStartPath { kind: ExportKind },
}

/// Validate the entire configuration
pub fn validate(config: &Config) -> Result<(), ValidationError> {
    validate_api(config)?;
    validate_export(config)?;
    validate_kinds(config)?;
    Ok(())
}

fn validate_url(field: &str, value: &str) -> Result<(), ValidationError> {
    let valid = Url::parse(value)
        .map(|url| matches!(url.scheme(), "http" | "https") && url.has_host())
        .unwrap_or(false);

    if !valid {
        return Err(ValidationError::InvalidUrl {
            field: field.to_string(),
            value: value.to_string(),
        });
    }

    Ok(())
}

fn validate_api(config: &Config) -> Result<(), ValidationError> {
    validate_url("base_url", &config.api.base_url)?;

    if let Some(ref download_base) = config.api.download_base_url {
        validate_url("download_base_url", download_base)?;
    }

    if config.api.request_timeout.is_zero() {
        return Err(ValidationError::ZeroDuration {
            field: "request_timeout".to_string(),
        });
    }

    Ok(())
}

fn validate_export(config: &Config) -> Result<(), ValidationError> {
    let export = &config.export;

    if export.poll_interval.is_zero() {
        return Err(ValidationError::ZeroDuration {
            field: "poll_interval".to_string(),
        });
    }

    if export.frame_interval.is_zero() {
        return Err(ValidationError::ZeroDuration {
            field: "frame_interval".to_string(),
        });
    }

    if export.max_poll_duration.is_some_and(|d| d.is_zero()) {
        return Err(ValidationError::ZeroDuration {
            field: "max_poll_duration".to_string(),
        });
    }

    if export.max_poll_failures == Some(0) {
        return Err(ValidationError::ZeroPollFailures);
    }

    Ok(())
}

fn validate_kinds(config: &Config) -> Result<(), ValidationError> {
    for kind in ExportKind::ALL {
        let endpoints = config.endpoints(kind);

        if endpoints.start_path.trim().is_empty() {
            return Err(ValidationError::EmptyStartPath { kind });
        }

        if !endpoints.status_path.contains("{job_id}") {
            return Err(ValidationError::MissingJobIdPlaceholder {
                kind,
                path: endpoints.status_path,
            });
        }
    }

    Ok(())
}
