//! Configuration management
//!
//! All settings are read once at startup into an [`IngestConfig`] value which is
//! then handed to each component. Nothing reads the environment after that.

use crate::error::{IngestError, Result};
use serde::{Deserialize, Serialize};
use sqlx::postgres::PgConnectOptions;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

// ============================================================================
// Registry API Defaults
// ============================================================================

/// Studies search endpoint of the ClinicalTrials.gov v2 API.
pub const DEFAULT_API_BASE_URL: &str = "https://clinicaltrials.gov/api/v2/studies";

/// Studies requested per page.
pub const DEFAULT_PAGE_SIZE: u32 = 100;

/// Largest page size the registry accepts.
pub const MAX_PAGE_SIZE: u32 = 1000;

/// Records ingested per run.
pub const DEFAULT_RECORD_LIMIT: usize = 1000;

/// Per-request timeout in seconds.
pub const DEFAULT_API_TIMEOUT_SECS: u64 = 30;

// ============================================================================
// Destination Database Defaults
// ============================================================================

pub const DEFAULT_DB_HOST: &str = "postgres";
pub const DEFAULT_DB_PORT: u16 = 5432;
pub const DEFAULT_DB_NAME: &str = "clinical_trials";
pub const DEFAULT_DB_USER: &str = "user";
pub const DEFAULT_DB_PASSWORD: &str = "password";
pub const DEFAULT_DB_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Ingestion configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IngestConfig {
    pub api: ApiConfig,
    pub database: DatabaseConfig,
}

/// Registry API settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ApiConfig {
    pub base_url: String,
    pub page_size: u32,
    /// Upper bound on records fetched per run
    pub record_limit: usize,
    pub timeout_secs: u64,
}

/// Destination database settings
///
/// `url`, when set, takes precedence over the discrete connection fields.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DatabaseConfig {
    pub url: Option<String>,
    pub host: String,
    pub port: u16,
    pub name: String,
    pub user: String,
    #[serde(skip_serializing)]
    pub password: String,
    pub connect_timeout_secs: u64,
}

impl IngestConfig {
    /// Load configuration from `.env` (if present), environment and defaults
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_env()
    }

    /// Load configuration from environment variables only
    pub fn from_env() -> Result<Self> {
        let config = Self {
            api: ApiConfig {
                base_url: env_string("CTP_API_BASE_URL", DEFAULT_API_BASE_URL),
                page_size: env_parse("CTP_PAGE_SIZE", DEFAULT_PAGE_SIZE)?,
                record_limit: env_parse("CTP_RECORD_LIMIT", DEFAULT_RECORD_LIMIT)?,
                timeout_secs: env_parse("CTP_API_TIMEOUT_SECS", DEFAULT_API_TIMEOUT_SECS)?,
            },
            database: DatabaseConfig {
                url: std::env::var("DATABASE_URL").ok().filter(|u| !u.trim().is_empty()),
                host: env_string("CTP_DB_HOST", DEFAULT_DB_HOST),
                port: env_parse("CTP_DB_PORT", DEFAULT_DB_PORT)?,
                name: env_string("CTP_DB_NAME", DEFAULT_DB_NAME),
                user: env_string("CTP_DB_USER", DEFAULT_DB_USER),
                password: env_string("CTP_DB_PASSWORD", DEFAULT_DB_PASSWORD),
                connect_timeout_secs: env_parse(
                    "CTP_DB_CONNECT_TIMEOUT_SECS",
                    DEFAULT_DB_CONNECT_TIMEOUT_SECS,
                )?,
            },
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        self.api.validate()?;
        self.database.validate()
    }
}

impl ApiConfig {
    pub fn validate(&self) -> Result<()> {
        if self.base_url.trim().is_empty() {
            return Err(IngestError::config("API base URL cannot be empty"));
        }

        if self.page_size == 0 || self.page_size > MAX_PAGE_SIZE {
            return Err(IngestError::config(format!(
                "Page size must be between 1 and {MAX_PAGE_SIZE}, got {}",
                self.page_size
            )));
        }

        if self.timeout_secs == 0 {
            return Err(IngestError::config("API timeout must be greater than 0"));
        }

        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl DatabaseConfig {
    pub fn validate(&self) -> Result<()> {
        if self.url.is_some() {
            return Ok(());
        }

        if self.host.trim().is_empty() {
            return Err(IngestError::config("Database host cannot be empty"));
        }

        if self.port == 0 {
            return Err(IngestError::config("Database port must be greater than 0"));
        }

        if self.name.trim().is_empty() {
            return Err(IngestError::config("Database name cannot be empty"));
        }

        Ok(())
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// Build sqlx connection options from the configured descriptor
    pub fn connect_options(&self) -> Result<PgConnectOptions> {
        match self.url {
            Some(ref url) => PgConnectOptions::from_str(url)
                .map_err(|e| IngestError::config(format!("Invalid DATABASE_URL: {e}"))),
            None => Ok(PgConnectOptions::new()
                .host(&self.host)
                .port(self.port)
                .database(&self.name)
                .username(&self.user)
                .password(&self.password)),
        }
    }
}

impl fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("url", &self.url.as_ref().map(|_| "<redacted>"))
            .field("host", &self.host)
            .field("port", &self.port)
            .field("name", &self.name)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("connect_timeout_secs", &self.connect_timeout_secs)
            .finish()
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_BASE_URL.to_string(),
            page_size: DEFAULT_PAGE_SIZE,
            record_limit: DEFAULT_RECORD_LIMIT,
            timeout_secs: DEFAULT_API_TIMEOUT_SECS,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            host: DEFAULT_DB_HOST.to_string(),
            port: DEFAULT_DB_PORT,
            name: DEFAULT_DB_NAME.to_string(),
            user: DEFAULT_DB_USER.to_string(),
            password: DEFAULT_DB_PASSWORD.to_string(),
            connect_timeout_secs: DEFAULT_DB_CONNECT_TIMEOUT_SECS,
        }
    }
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            api: ApiConfig::default(),
            database: DatabaseConfig::default(),
        }
    }
}

fn env_string(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parse<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| IngestError::config(format!("{key}={raw:?} is not valid: {e}"))),
        Err(_) => Ok(default),
    }
}
