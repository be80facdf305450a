//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::net::SocketAddr;
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
    /// HMAC secret for signing bearer tokens. Process-wide; rotating it
    /// invalidates every outstanding token.
    pub jwt_secret: String,
    pub token_ttl_days: i64,
    pub completion_api_key: String,
    pub completion_api_base: String,
    pub completion_model: String,
    pub default_daily_limit: u32,
    /// Origins allowed by the CORS layer. Empty means any origin.
    pub allowed_origins: Vec<String>,
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
        let bind_address = bind_address_str
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string()))?;

        let database_url = std::env::var("DATABASE_URL")
            .map_err(|_| ConfigError::MissingVar("DATABASE_URL".to_string()))?;

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        // --- Load Auth Settings ---
        let jwt_secret = std::env::var("JWT_SECRET")
            .map_err(|_| ConfigError::MissingVar("JWT_SECRET".to_string()))?;

        let token_ttl_days = match std::env::var("TOKEN_TTL_DAYS") {
            Ok(raw) => raw.parse::<i64>().ok().filter(|d| *d > 0).ok_or_else(|| {
                ConfigError::InvalidValue(
                    "TOKEN_TTL_DAYS".to_string(),
                    format!("'{}' is not a positive number of days", raw),
                )
            })?,
            Err(_) => 30,
        };

        // --- Load Completion API Settings ---
        let completion_api_key = std::env::var("GROQ_API_KEY")
            .map_err(|_| ConfigError::MissingVar("GROQ_API_KEY".to_string()))?;
        let completion_api_base = std::env::var("COMPLETION_API_BASE")
            .unwrap_or_else(|_| "https://api.groq.com/openai/v1".to_string());
        let completion_model = std::env::var("COMPLETION_MODEL")
            .unwrap_or_else(|_| "llama-3.3-70b-versatile".to_string());

        // --- Load Quota Settings ---
        let default_daily_limit = match std::env::var("DEFAULT_DAILY_LIMIT") {
            Ok(raw) => raw.parse::<u32>().ok().filter(|l| *l > 0).ok_or_else(|| {
                ConfigError::InvalidValue(
                    "DEFAULT_DAILY_LIMIT".to_string(),
                    format!("'{}' is not a positive limit", raw),
                )
            })?,
            Err(_) => study_helper_core::DEFAULT_DAILY_LIMIT,
        };

        let allowed_origins = std::env::var("ALLOWED_ORIGINS")
            .map(|raw| {
                raw.split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            bind_address,
            database_url,
            log_level,
            jwt_secret,
            token_ttl_days,
            completion_api_key,
            completion_api_base,
            completion_model,
            default_daily_limit,
            allowed_origins,
        })
    }
}
