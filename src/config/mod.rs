//! Configuration module for Lode-Finder
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use lode_finder::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("lode.toml")).unwrap();
//! println!("Model calls per minute: {}", config.pipeline.llm_requests_per_minute);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    ApiKeys, Config, CrawlProviderKind, Endpoints, LlmProviderKind, OutputConfig, PipelineConfig,
    ProvidersConfig, SearchProviderKind,
};

// Re-export parser functions
pub use parser::{
    apply_env_overrides, compute_config_hash, load_config, load_config_with_hash, parse_config,
};
pub use validation::validate;
