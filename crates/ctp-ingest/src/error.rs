//! Error types for the ingestion routine
//!
//! Every failure aborts the run. The binary's single top-level handler turns
//! the variant into a distinct process exit code via [`IngestError::exit_code`]
//! so the outer scheduler can tell failure kinds apart.

use thiserror::Error;

/// Result type alias for ingestion operations
pub type Result<T> = std::result::Result<T, IngestError>;

/// Exit status used when a configuration value is missing or invalid.
pub const EXIT_CONFIG: i32 = 2;
/// Exit status used when the registry answers with a non-success status.
pub const EXIT_HTTP: i32 = 3;
/// Exit status used for transport failures and request timeouts.
pub const EXIT_NETWORK: i32 = 4;
/// Exit status used when a response body has an unexpected shape.
pub const EXIT_PARSE: i32 = 5;
/// Exit status used for destination database failures.
pub const EXIT_DATABASE: i32 = 6;

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("Configuration error: {0}")]
    Config(String),

    /// Registry API returned a non-success status
    #[error("Registry API returned HTTP {status} for {url}")]
    Http {
        status: u16,
        url: String,
        /// Response body, kept for diagnosis
        body: String,
    },

    /// Transport failure or timeout talking to the registry
    #[error("Network request failed: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Failed to parse registry response: {0}")]
    Parse(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// An external pipeline step exited unsuccessfully
    #[error("Step '{step}' failed with exit code {code}")]
    StepFailed { step: String, code: i32 },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl IngestError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }

    /// Process exit status for this failure
    ///
    /// A failed external step propagates the step's own code.
    pub fn exit_code(&self) -> i32 {
        match self {
            IngestError::Config(_) => EXIT_CONFIG,
            IngestError::Http { .. } => EXIT_HTTP,
            IngestError::Network(_) => EXIT_NETWORK,
            IngestError::Parse(_) => EXIT_PARSE,
            IngestError::Database(_) => EXIT_DATABASE,
            IngestError::StepFailed { code, .. } => *code,
            IngestError::Io(_) => 1,
        }
    }
}

impl From<serde_json::Error> for IngestError {
    fn from(err: serde_json::Error) -> Self {
        Self::Parse(err.to_string())
    }
}
