use serde::Deserialize;
use std::fmt;
use std::time::Duration;

/// Main configuration structure for Lode-Finder
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub providers: ProvidersConfig,
    pub output: OutputConfig,
}

/// Pipeline tuning knobs
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Extra attempts after the first one for rate-limited model calls
    #[serde(rename = "max-retries")]
    pub max_retries: u32,

    /// Upper bound for every outbound network call (milliseconds)
    #[serde(rename = "request-timeout-ms")]
    pub request_timeout_ms: u64,

    /// Cap on the merged crawl text of one category (characters)
    #[serde(rename = "max-content-length")]
    pub max_content_length: usize,

    /// Cap on the text kept from a single crawled page (characters)
    #[serde(rename = "max-content-length-per-url")]
    pub max_content_length_per_url: usize,

    /// Pages shorter than this are treated as not found
    #[serde(rename = "min-content-length")]
    pub min_content_length: usize,

    #[serde(rename = "search-results-per-query")]
    pub search_results_per_query: usize,

    #[serde(rename = "max-urls-to-crawl-per-topic")]
    pub max_urls_to_crawl_per_topic: usize,

    /// Companies processed at the same time within one run
    #[serde(rename = "concurrent-companies")]
    pub concurrent_companies: usize,

    /// Global quota shared by every language model call in the process
    #[serde(rename = "llm-requests-per-minute")]
    pub llm_requests_per_minute: u32,

    /// Whether 429-class model errors are retried at all
    #[serde(rename = "retry-on-429")]
    pub retry_on_429: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            request_timeout_ms: 30_000,
            max_content_length: 30_000,
            max_content_length_per_url: 20_000,
            min_content_length: 100,
            search_results_per_query: 5,
            max_urls_to_crawl_per_topic: 3,
            concurrent_companies: 2,
            llm_requests_per_minute: 4,
            retry_on_429: true,
        }
    }
}

impl PipelineConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

/// Provider selection and credentials
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProvidersConfig {
    #[serde(default)]
    pub search: SearchProviderKind,

    #[serde(default)]
    pub crawl: CrawlProviderKind,

    #[serde(default)]
    pub llm: LlmProviderKind,

    /// Overrides the provider's default model name
    #[serde(default)]
    pub model: Option<String>,

    #[serde(default)]
    pub keys: ApiKeys,

    #[serde(default)]
    pub endpoints: Endpoints,
}

/// API keys; any key left out falls back to its environment variable
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiKeys {
    pub serper: Option<String>,
    pub brave: Option<String>,
    pub gemini: Option<String>,
    pub groq: Option<String>,
}

/// Base URL overrides, mainly for pointing providers at a local mock
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Endpoints {
    pub serper: Option<String>,
    pub brave: Option<String>,
    pub duckduckgo: Option<String>,
    pub jina: Option<String>,
    pub gemini: Option<String>,
    pub groq: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchProviderKind {
    Serper,
    Brave,
    #[default]
    DuckDuckGo,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CrawlProviderKind {
    #[default]
    Jina,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmProviderKind {
    #[default]
    Gemini,
    Groq,
}

impl fmt::Display for SearchProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Serper => "serper",
            Self::Brave => "brave",
            Self::DuckDuckGo => "duckduckgo",
        })
    }
}

impl fmt::Display for CrawlProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Jina => "jina",
        })
    }
}

impl fmt::Display for LlmProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Gemini => "gemini",
            Self::Groq => "groq",
        })
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,
}
