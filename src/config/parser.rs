use crate::config::types::Config;
use crate::config::validation::validate;
use crate::ConfigError;
use sha2::{Digest, Sha256};
use std::path::Path;

/// Loads and parses a configuration file from the given path
///
/// Environment overrides are applied after parsing and before validation, so
/// an override can never smuggle an out-of-range value past the validator.
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
/// use lode_finder::config::load_config;
///
/// let config = load_config(Path::new("lode.toml")).unwrap();
/// println!("Concurrency: {}", config.pipeline.concurrent_companies);
/// ```
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let mut config = parse_config(&content)?;
    apply_env_overrides(&mut config, |key| std::env::var(key).ok())?;
    validate(&config)?;
    Ok(config)
}

/// Parses TOML text into a configuration without validating it
pub fn parse_config(content: &str) -> Result<Config, ConfigError> {
    Ok(toml::from_str(content)?)
}

/// Applies the supported environment variable overrides
///
/// * `CONCURRENT_COMPANIES` - pipeline.concurrent-companies
/// * `LLM_REQUESTS_PER_MINUTE` - pipeline.llm-requests-per-minute
/// * `LLM_RETRY_ON_429` - pipeline.retry-on-429 (anything but "false" enables it)
///
/// The lookup is injected so tests do not have to mutate the process environment.
pub fn apply_env_overrides<F>(config: &mut Config, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(raw) = lookup("CONCURRENT_COMPANIES") {
        config.pipeline.concurrent_companies = raw.trim().parse().map_err(|_| {
            ConfigError::Validation(format!("CONCURRENT_COMPANIES must be a number, got '{}'", raw))
        })?;
    }

    if let Some(raw) = lookup("LLM_REQUESTS_PER_MINUTE") {
        config.pipeline.llm_requests_per_minute = raw.trim().parse().map_err(|_| {
            ConfigError::Validation(format!(
                "LLM_REQUESTS_PER_MINUTE must be a number, got '{}'",
                raw
            ))
        })?;
    }

    if let Some(raw) = lookup("LLM_RETRY_ON_429") {
        config.pipeline.retry_on_429 = raw.trim().to_lowercase() != "false";
    }

    Ok(())
}

/// Computes a SHA-256 hash of the configuration file content
///
/// Logged at startup so runs can be correlated with the config that produced them.
pub fn compute_config_hash(path: &Path) -> Result<String, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    let result = hasher.finalize();
    Ok(hex::encode(result))
}

/// Loads a configuration and returns both the config and its hash
pub fn load_config_with_hash(path: &Path) -> Result<(Config, String), ConfigError> {
    let config = load_config(path)?;
    let hash = compute_config_hash(path)?;
    Ok((config, hash))
}
