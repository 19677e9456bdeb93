//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::net::SocketAddr;
use std::time::Duration;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub database_url: String,
    pub log_level: Level,
    pub openai_api_key: Option<String>,
    pub generation_model: String,
    /// Upper bound on one generation call; the backend can take minutes.
    pub generation_timeout: Duration,
    /// Base URL of the host LMS, used to build return-to-course links.
    pub course_base_url: String,
    pub enable_templates: bool,
    /// Newline-separated `Label|course-id|section-number?` template entries.
    pub curriculum_templates: String,
    pub enable_file_upload: bool,
    /// Course layouts installed on the host LMS.
    pub installed_layouts: Vec<String>,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination.
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        // --- Load Server and Database Settings ---
        let bind_address_str =
            std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
        let bind_address = bind_address_str.parse::<SocketAddr>().map_err(|e| {
            ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string())
        })?;

        let database_url = std::env::var("DATABASE_URL")
            .map_err(|_| ConfigError::MissingVar("DATABASE_URL".to_string()))?;

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        // --- Load Generation Settings ---
        let openai_api_key = std::env::var("OPENAI_API_KEY").ok();
        let generation_model =
            std::env::var("GENERATION_MODEL").unwrap_or_else(|_| "gpt-4o".to_string());

        let timeout_str =
            std::env::var("GENERATION_TIMEOUT_SECS").unwrap_or_else(|_| "300".to_string());
        let timeout_secs = timeout_str.parse::<u64>().map_err(|_| {
            ConfigError::InvalidValue(
                "GENERATION_TIMEOUT_SECS".to_string(),
                format!("'{}' is not a number of seconds", timeout_str),
            )
        })?;
        let generation_timeout = Duration::from_secs(timeout_secs);

        // --- Load Host-LMS Settings ---
        let course_base_url = std::env::var("COURSE_BASE_URL")
            .unwrap_or_else(|_| "http://localhost".to_string());

        let enable_templates = env_flag("ENABLE_TEMPLATES");
        let curriculum_templates =
            std::env::var("CURRICULUM_TEMPLATES").unwrap_or_default();
        let enable_file_upload = env_flag("ENABLE_FILE_UPLOAD");

        let layouts_str =
            std::env::var("COURSE_LAYOUTS").unwrap_or_else(|_| "weeks,topics".to_string());
        let installed_layouts = layouts_str
            .split(',')
            .map(str::trim)
            .filter(|layout| !layout.is_empty())
            .map(str::to_owned)
            .collect();

        Ok(Self {
            bind_address,
            database_url,
            log_level,
            openai_api_key,
            generation_model,
            generation_timeout,
            course_base_url,
            enable_templates,
            curriculum_templates,
            enable_file_upload,
            installed_layouts,
        })
    }
}

fn env_flag(name: &str) -> bool {
    std::env::var(name)
        .map(|value| matches!(value.trim(), "1" | "true" | "yes" | "on"))
        .unwrap_or(false)
}
