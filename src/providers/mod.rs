//! External provider interfaces and their concrete HTTP implementations
//!
//! The pipeline only sees the three traits defined here:
//! - `Search`: web search returning result URLs
//! - `Crawl`: fetches a URL as markdown
//! - `Extractor`: turns page text into leader and asset records
//!
//! Concrete providers are picked once at startup from configuration and
//! handed to the coordinator as a `Providers` bundle.

mod crawl;
mod http;
pub mod llm;
mod search;

pub use crawl::JinaCrawler;
pub use http::{build_http_client, parse_retry_after};
pub use llm::{GeminiModel, GroqModel, LanguageModel, ModelExtractor};
pub use search::{BraveSearch, DuckDuckGoSearch, SerperSearch};

use crate::config::{Config, CrawlProviderKind, LlmProviderKind, SearchProviderKind};
use crate::extraction::ParseError;
use crate::model::{AssetRecord, LeaderRecord};
use crate::ConfigError;
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// One web search hit
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchResult {
    pub url: String,
    pub title: String,
    pub snippet: String,
}

/// A crawled page rendered as markdown
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlResult {
    pub markdown: String,
    pub title: String,
}

/// Parsed records together with the model text they came from
#[derive(Debug, Clone, PartialEq)]
pub struct Extraction<T> {
    pub records: Vec<T>,
    pub raw: String,
}

#[async_trait]
pub trait Search: Send + Sync {
    /// Short provider name used in logs
    fn name(&self) -> &'static str;

    /// True when the provider spaces out its own requests
    ///
    /// Such a provider bounds each HTTP request itself, so callers must not
    /// put a timeout around the whole call: it would count time spent queued.
    fn queues_requests(&self) -> bool {
        false
    }

    /// Runs one query, returning at most `max_results` hits
    async fn search(&self, query: &str, max_results: usize)
        -> Result<Vec<SearchResult>, SearchError>;
}

#[async_trait]
pub trait Crawl: Send + Sync {
    async fn crawl(&self, url: &str) -> Result<CrawlResult, CrawlError>;
}

#[async_trait]
pub trait Extractor: Send + Sync {
    async fn extract_leadership(
        &self,
        text: &str,
        entity_name: &str,
    ) -> Result<Extraction<LeaderRecord>, ExtractionError>;

    async fn extract_assets(
        &self,
        text: &str,
        entity_name: &str,
    ) -> Result<Extraction<AssetRecord>, ExtractionError>;
}

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("{provider} request failed: {source}")]
    Http {
        provider: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("{provider} returned HTTP {status}: {body}")]
    Status {
        provider: &'static str,
        status: u16,
        body: String,
    },

    #[error("{provider} is rate limiting requests")]
    RateLimited { provider: &'static str },

    #[error("{provider} response could not be decoded: {message}")]
    Decode {
        provider: &'static str,
        message: String,
    },

    #[error("{provider} search timed out")]
    Timeout { provider: &'static str },
}

impl SearchError {
    pub(crate) fn from_reqwest(provider: &'static str, source: reqwest::Error) -> Self {
        if source.is_timeout() {
            Self::Timeout { provider }
        } else {
            Self::Http { provider, source }
        }
    }
}

#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("crawl of {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("crawl of {url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("crawl of {url} returned an undecodable body: {message}")]
    Decode { url: String, message: String },

    #[error("crawl of {url} timed out")]
    Timeout { url: String },
}

impl CrawlError {
    pub(crate) fn from_reqwest(url: &str, source: reqwest::Error) -> Self {
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
}

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("{provider} rate limit exceeded")]
    RateLimited {
        provider: &'static str,
        /// Wait suggested by the provider, if it sent one
        retry_after: Option<Duration>,
    },

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("{provider} request failed: {source}")]
    Http {
        provider: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("{provider} returned HTTP {status}: {body}")]
    Status {
        provider: &'static str,
        status: u16,
        body: String,
    },

    #[error("{provider} response could not be decoded: {message}")]
    Decode {
        provider: &'static str,
        message: String,
    },

    #[error("{provider} request timed out")]
    Timeout { provider: &'static str },
}

impl ExtractionError {
    pub(crate) fn from_reqwest(provider: &'static str, source: reqwest::Error) -> Self {
        if source.is_timeout() {
            Self::Timeout { provider }
        } else {
            Self::Http { provider, source }
        }
    }

    /// Returns true for errors the retry policy may retry
    pub fn is_rate_limit(&self) -> bool {
        matches!(self, Self::RateLimited { .. })
    }

    /// Provider-suggested wait before the next attempt
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimited { retry_after, .. } => *retry_after,
            _ => None,
        }
    }
}

/// The provider set one coordinator works with
#[derive(Clone)]
pub struct Providers {
    pub search: Arc<dyn Search>,
    pub crawl: Arc<dyn Crawl>,
    pub extractor: Arc<dyn Extractor>,
}

pub const SERPER_BASE_URL: &str = "https://google.serper.dev";
pub const BRAVE_BASE_URL: &str = "https://api.search.brave.com";
pub const DUCKDUCKGO_BASE_URL: &str = "https://html.duckduckgo.com";
pub const JINA_BASE_URL: &str = "https://r.jina.ai";
pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const GROQ_BASE_URL: &str = "https://api.groq.com";

impl Providers {
    pub fn new(
        search: Arc<dyn Search>,
        crawl: Arc<dyn Crawl>,
        extractor: Arc<dyn Extractor>,
    ) -> Self {
        Self {
            search,
            crawl,
            extractor,
        }
    }

    /// Builds the configured providers
    ///
    /// API keys come from `providers.keys` first and the environment second.
    /// A provider whose key is missing fails here rather than on first use.
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        Self::from_config_with_env(config, |name| std::env::var(name).ok())
    }

    /// Same as `from_config` with an injectable environment lookup
    pub fn from_config_with_env<F>(config: &Config, env: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let client = build_http_client(config.pipeline.request_timeout())?;
        let keys = &config.providers.keys;
        let endpoints = &config.providers.endpoints;

        let search: Arc<dyn Search> = match config.providers.search {
            SearchProviderKind::Serper => Arc::new(SerperSearch::new(
                client.clone(),
                resolve_key(keys.serper.as_deref(), "serper", "SERPER_API_KEY", &env)?,
                endpoint(&endpoints.serper, SERPER_BASE_URL),
            )),
            SearchProviderKind::Brave => Arc::new(BraveSearch::new(
                client.clone(),
                resolve_key(keys.brave.as_deref(), "brave", "BRAVE_SEARCH_API_KEY", &env)?,
                endpoint(&endpoints.brave, BRAVE_BASE_URL),
            )),
            SearchProviderKind::DuckDuckGo => Arc::new(
                DuckDuckGoSearch::new(
                    client.clone(),
                    endpoint(&endpoints.duckduckgo, DUCKDUCKGO_BASE_URL),
                )
                .with_request_timeout(config.pipeline.request_timeout()),
            ),
        };

        let crawl: Arc<dyn Crawl> = match config.providers.crawl {
            CrawlProviderKind::Jina => Arc::new(JinaCrawler::new(
                client.clone(),
                endpoint(&endpoints.jina, JINA_BASE_URL),
            )),
        };

        let model: Box<dyn LanguageModel> = match config.providers.llm {
            LlmProviderKind::Gemini => Box::new(GeminiModel::new(
                client,
                resolve_key(keys.gemini.as_deref(), "gemini", "GEMINI_API_KEY", &env)?,
                config.providers.model.clone(),
                endpoint(&endpoints.gemini, GEMINI_BASE_URL),
            )),
            LlmProviderKind::Groq => Box::new(GroqModel::new(
                client,
                resolve_key(keys.groq.as_deref(), "groq", "GROQ_API_KEY", &env)?,
                config.providers.model.clone(),
                endpoint(&endpoints.groq, GROQ_BASE_URL),
            )),
        };

        tracing::info!(
            "Providers: search={}, crawl={}, llm={} ({})",
            config.providers.search,
            config.providers.crawl,
            config.providers.llm,
            model.model_name()
        );

        let extractor = ModelExtractor::new(model, config.pipeline.max_content_length);

        Ok(Self::new(search, crawl, Arc::new(extractor)))
    }
}

fn endpoint(configured: &Option<String>, default: &str) -> String {
    configured
        .as_deref()
        .unwrap_or(default)
        .trim_end_matches('/')
        .to_string()
}

fn resolve_key<F>(
    configured: Option<&str>,
    key: &'static str,
    env_var: &'static str,
    env: &F,
) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    configured
        .map(str::to_string)
        .or_else(|| env(env_var))
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .ok_or(ConfigError::MissingApiKey {
            provider: key,
            env_var,
            key,
        })
}
