//! Lode-Finder: a company intelligence extraction pipeline
//!
//! This crate takes a list of company names and, for each one, searches the web
//! for leadership and operations pages, crawls them to markdown, extracts
//! structured leader and asset records with a language model, and persists the
//! result. All model calls share one process-wide rate limiter.

pub mod config;
pub mod extraction;
pub mod model;
pub mod pipeline;
pub mod providers;
pub mod report;
pub mod storage;

use thiserror::Error;

/// Main error type for Lode-Finder operations
#[derive(Debug, Error)]
pub enum LodeError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Search error: {0}")]
    Search(#[from] providers::SearchError),

    #[error("Crawl error: {0}")]
    Crawl(#[from] providers::CrawlError),

    #[error("Extraction error: {0}")]
    Extraction(#[from] providers::ExtractionError),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Pipeline task failed: {0}")]
    Task(String),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
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

    #[error("Missing API key for {provider} (set {env_var} or providers.keys.{key})")]
    MissingApiKey {
        provider: &'static str,
        env_var: &'static str,
        key: &'static str,
    },

    #[error("Failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
}

/// Result type alias for Lode-Finder operations
pub type Result<T> = std::result::Result<T, LodeError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use model::{AssetRecord, AssetStatus, EntityState, LeaderRecord, PipelineStep, RunStatus};
pub use pipeline::{Coordinator, RunOutcome};
