//! Search, crawl and extraction steps shared by the entity processor and
//! the debug pipeline
//!
//! Every outbound call is bounded by the request timeout. Time spent waiting
//! in a queue is not counted: model calls are timed inside their slot on the
//! process-wide rate limiter, and search providers that queue their own
//! requests time each request themselves. Model calls also go through the
//! retry policy.

use crate::config::PipelineConfig;
use crate::extraction::{truncate_chars, RateLimiter, RetryPolicy};
use crate::model::{AssetRecord, LeaderRecord};
use crate::providers::{
    CrawlError, CrawlResult, Extraction, ExtractionError, Providers, SearchError, SearchResult,
};
use std::future::Future;
use std::sync::Arc;
use tokio::time::timeout;
use tracing::{debug, warn};

/// Separator placed between crawled pages and between categories
pub const PAGE_SEPARATOR: &str = "\n\n---\n\n";

/// Results of the two search queries for one company
#[derive(Debug, Default)]
pub struct SearchOutcome {
    pub leadership: Vec<SearchResult>,
    pub assets: Vec<SearchResult>,
    /// Query failures, already logged
    pub errors: Vec<String>,
}

impl SearchOutcome {
    pub fn is_empty(&self) -> bool {
        self.leadership.is_empty() && self.assets.is_empty()
    }
}

/// Usable crawled text for one category
#[derive(Debug, Default)]
pub struct CrawledText {
    /// Kept pages joined and capped
    pub text: String,
    /// Characters in the joined pages before the overall cap
    pub content_length: usize,
    /// First URL that produced usable content
    pub source_url: Option<String>,
    pub pages_used: usize,
    pub pages_attempted: usize,
}

pub fn leadership_query(name: &str) -> String {
    format!("{} mining company leadership board executives management team", name)
}

pub fn assets_query(name: &str) -> String {
    format!("{} mining operations mines projects assets properties", name)
}

/// The provider calls a pipeline makes, with their limits applied
pub struct Stages {
    providers: Providers,
    limiter: Arc<RateLimiter>,
    retry: RetryPolicy,
    config: PipelineConfig,
}

impl Stages {
    pub fn new(
        providers: Providers,
        limiter: Arc<RateLimiter>,
        retry: RetryPolicy,
        config: PipelineConfig,
    ) -> Self {
        Self {
            providers,
            limiter,
            retry,
            config,
        }
    }

    /// Runs the leadership and asset queries concurrently
    ///
    /// A failed query counts as zero results.
    pub async fn search(&self, name: &str) -> SearchOutcome {
        let leadership_query = leadership_query(name);
        let assets_query = assets_query(name);

        let (leadership, assets) = tokio::join!(
            self.run_query(&leadership_query),
            self.run_query(&assets_query)
        );

        let mut outcome = SearchOutcome::default();
        match leadership {
            Ok(results) => outcome.leadership = results,
            Err(e) => {
                warn!("Leadership search failed: {}", e);
                outcome.errors.push(format!("leadership: {}", e));
            }
        }
        match assets {
            Ok(results) => outcome.assets = results,
            Err(e) => {
                warn!("Assets search failed: {}", e);
                outcome.errors.push(format!("assets: {}", e));
            }
        }

        debug!(
            "Search returned {} leadership and {} asset result(s)",
            outcome.leadership.len(),
            outcome.assets.len()
        );
        outcome
    }

    async fn run_query(&self, query: &str) -> Result<Vec<SearchResult>, SearchError> {
        let search = &self.providers.search;
        let request = search.search(query, self.config.search_results_per_query);
        if search.queues_requests() {
            return request.await;
        }

        match timeout(self.config.request_timeout(), request).await {
            Ok(result) => result,
            Err(_) => Err(SearchError::Timeout {
                provider: search.name(),
            }),
        }
    }

    /// Crawls up to the per-topic limit of `urls` and merges the usable pages
    ///
    /// The limit counts attempts, not successes. Short pages and failed
    /// crawls are skipped.
    pub async fn crawl_category(&self, category: &str, urls: &[String]) -> CrawledText {
        let mut pages = Vec::new();
        let mut crawled = CrawledText::default();

        for url in urls.iter().take(self.config.max_urls_to_crawl_per_topic) {
            crawled.pages_attempted += 1;

            let markdown = match self.crawl_one(url).await {
                Ok(page) => page.markdown,
                Err(e) => {
                    warn!("Skipping {} page: {}", category, e);
                    continue;
                }
            };

            let length = markdown.chars().count();
            if length < self.config.min_content_length {
                debug!(
                    "Skipping {} ({} chars, below minimum of {})",
                    url, length, self.config.min_content_length
                );
                continue;
            }

            pages.push(truncate_chars(&markdown, self.config.max_content_length_per_url).to_string());
            crawled.source_url.get_or_insert_with(|| url.clone());
        }

        crawled.pages_used = pages.len();
        let joined = pages.join(PAGE_SEPARATOR);
        crawled.content_length = joined.chars().count();
        crawled.text = truncate_chars(&joined, self.config.max_content_length).to_string();

        debug!(
            "{} crawl kept {}/{} page(s), {} chars",
            category,
            crawled.pages_used,
            crawled.pages_attempted,
            crawled.text.len()
        );
        crawled
    }

    async fn crawl_one(&self, url: &str) -> Result<CrawlResult, CrawlError> {
        match timeout(self.config.request_timeout(), self.providers.crawl.crawl(url)).await {
            Ok(result) => result,
            Err(_) => Err(CrawlError::Timeout {
                url: url.to_string(),
            }),
        }
    }

    pub async fn extract_leadership(
        &self,
        text: &str,
        name: &str,
    ) -> Result<Extraction<LeaderRecord>, ExtractionError> {
        let extractor = &self.providers.extractor;
        self.limited("leadership extraction", || extractor.extract_leadership(text, name))
            .await
    }

    pub async fn extract_assets(
        &self,
        text: &str,
        name: &str,
    ) -> Result<Extraction<AssetRecord>, ExtractionError> {
        let extractor = &self.providers.extractor;
        self.limited("asset extraction", || extractor.extract_assets(text, name))
            .await
    }

    /// Runs a model call through the retry policy, with every attempt
    /// queued on the shared limiter and bounded by the request timeout
    async fn limited<T, F, Fut>(&self, label: &str, call: F) -> Result<T, ExtractionError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, ExtractionError>>,
    {
        let request_timeout = self.config.request_timeout();
        let limiter = &self.limiter;
        let call = &call;

        self.retry
            .run(label, move || async move {
                match limiter
                    .schedule(|| timeout(request_timeout, call()))
                    .await
                {
                    Ok(result) => result,
                    Err(_) => Err(ExtractionError::Timeout {
                        provider: "extractor",
                    }),
                }
            })
            .await
    }
}
