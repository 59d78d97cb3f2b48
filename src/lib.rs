//! Job-Harvest: a polite job-board scraper
//!
//! This crate discovers job postings from a paginated search listing, fetches
//! every detail page with a bounded pool of workers, extracts a structured
//! record per job, and reconciles it against the record persisted by earlier
//! runs so that activation and deactivation show up in the status history.

pub mod config;
pub mod crawler;
pub mod output;
pub mod state;
pub mod storage;

use thiserror::Error;

/// Main error type for Job-Harvest operations
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Request failed for {url}: {source}")]
    Http { url: String, source: reqwest::Error },

    #[error("Request timeout for {url}")]
    Timeout { url: String },

    #[error("HTTP {status} for {url}")]
    HttpStatus { url: String, status: u16 },

    #[error("Parsing failed for {url}: {message}")]
    Parse { url: String, message: String },

    #[error("Could not extract job ID from URL: {url}")]
    MissingJobId { url: String },

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Task panicked for {url}: {message}")]
    TaskPanicked { url: String, message: String },

    #[error("No job URLs discovered from {search_url}")]
    NothingDiscovered { search_url: String },

    #[error("No job records found in {dir}")]
    EmptyCorpus { dir: String },
}

impl HarvestError {
    /// Classifies a transport error, separating timeouts from other failures
    pub fn from_request(url: &str, source: reqwest::Error) -> Self {
        if source.is_timeout() {
            Self::Timeout {
                url: url.to_string(),
            }
        } else {
            Self::Http {
                url: url.to_string(),
                source,
            }
        }
    }

    /// Returns true for errors raised before or during the network fetch
    pub fn is_network(&self) -> bool {
        matches!(
            self,
            Self::Http { .. } | Self::Timeout { .. } | Self::HttpStatus { .. }
        )
    }
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Result type alias for Job-Harvest operations
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{extract_job_id, run_scrape};
pub use state::{FailureRecord, JobRecord, JobStatus, StatusEntry};
pub use storage::{JsonStore, Storage};
