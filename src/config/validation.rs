use crate::config::types::{Config, Endpoints, OutputConfig, PipelineConfig};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_pipeline_config(&config.pipeline)?;
    validate_endpoints(&config.providers.endpoints)?;
    validate_output_config(&config.output)?;
    Ok(())
}

/// Validates pipeline tuning values
fn validate_pipeline_config(config: &PipelineConfig) -> Result<(), ConfigError> {
    if config.concurrent_companies < 1 || config.concurrent_companies > 32 {
        return Err(ConfigError::Validation(format!(
            "concurrent_companies must be between 1 and 32, got {}",
            config.concurrent_companies
        )));
    }

    if config.llm_requests_per_minute < 1 || config.llm_requests_per_minute > 600 {
        return Err(ConfigError::Validation(format!(
            "llm_requests_per_minute must be between 1 and 600, got {}",
            config.llm_requests_per_minute
        )));
    }

    if config.request_timeout_ms < 1000 {
        return Err(ConfigError::Validation(format!(
            "request_timeout_ms must be >= 1000ms, got {}ms",
            config.request_timeout_ms
        )));
    }

    if config.max_retries > 10 {
        return Err(ConfigError::Validation(format!(
            "max_retries must be <= 10, got {}",
            config.max_retries
        )));
    }

    if config.search_results_per_query < 1 {
        return Err(ConfigError::Validation(
            "search_results_per_query must be >= 1".to_string(),
        ));
    }

    if config.max_urls_to_crawl_per_topic < 1 {
        return Err(ConfigError::Validation(
            "max_urls_to_crawl_per_topic must be >= 1".to_string(),
        ));
    }

    if config.max_content_length < 1 || config.max_content_length_per_url < 1 {
        return Err(ConfigError::Validation(
            "content length caps must be >= 1".to_string(),
        ));
    }

    if config.max_content_length_per_url > config.max_content_length {
        return Err(ConfigError::Validation(format!(
            "max_content_length_per_url ({}) cannot exceed max_content_length ({})",
            config.max_content_length_per_url, config.max_content_length
        )));
    }

    Ok(())
}

/// Validates that every endpoint override is an absolute http(s) URL
fn validate_endpoints(endpoints: &Endpoints) -> Result<(), ConfigError> {
    let overrides = [
        ("serper", &endpoints.serper),
        ("brave", &endpoints.brave),
        ("duckduckgo", &endpoints.duckduckgo),
        ("jina", &endpoints.jina),
        ("gemini", &endpoints.gemini),
        ("groq", &endpoints.groq),
    ];

    for (name, value) in overrides {
        let Some(raw) = value else { continue };
        let url = Url::parse(raw)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid {} endpoint: {}", name, e)))?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(ConfigError::InvalidUrl(format!(
                "{} endpoint must use http or https, got '{}'",
                name, raw
            )));
        }
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.database_path.trim().is_empty() {
        return Err(ConfigError::Validation(
            "database_path cannot be empty".to_string(),
        ));
    }

    Ok(())
}
