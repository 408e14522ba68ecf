//! Configuration management for siplah-export
//!
//! This module provides a layered configuration system that loads settings from:
//! 1. Default values (embedded in structs)
//! 2. TOML configuration file
//! 3. Environment variables (highest priority)
//!
//! # Usage
//!
//! ```no_run
//! use siplah_export::config::Config;
//!
//! let config = Config::load().expect("Failed to load configuration");
//! println!("Polling every {}", config.export.poll_interval);
//! ```
//!
//! # Environment Variables
//!
//! Configuration can be overridden using environment variables with the pattern:
//! `SIPLAH__<section>__<key>`
//!
//! Examples:
//! - `SIPLAH__API__BASE_URL=https://staging.example.test/api/`
//! - `SIPLAH__EXPORT__POLL_INTERVAL=5s`
//! - `SIPLAH__OUTPUT__DIR=/var/tmp/rekap`
//!
//! The API token is read from `SIPLAH_TOKEN` only and never from the file.
//!
//! # Configuration File
//!
//! By default, the configuration is loaded from `config/siplah-export.toml`.
//! This can be overridden using the `SIPLAH_EXPORT_CONFIG` environment variable.

mod models;
mod sources;
mod validation;

pub use crate::humanize::HumanDuration;
pub use models::{
    ApiConfig, Config, ExportSettings, KindConfig, KindEndpoints, OutputConfig,
};
pub use validation::ValidationError;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Configuration validation failed: {0}")]
    ValidationError(#[from] ValidationError),
}

impl Config {
    /// Load configuration from all sources (file + environment)
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration file is malformed or validation
    /// fails (bad URLs, zero intervals, status paths without `{job_id}`).
    pub fn load() -> Result<Self, ConfigError> {
        let config = sources::load()?;
        validation::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific path (environment overrides still apply)
    pub fn load_from_path(path: std::path::PathBuf) -> Result<Self, ConfigError> {
        let config = sources::load_path(path)?;
        validation::validate(&config)?;
        Ok(config)
    }
}
