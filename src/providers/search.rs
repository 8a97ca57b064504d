//! Web search providers
//!
//! - `SerperSearch`: Google results through serper.dev (API key)
//! - `BraveSearch`: Brave Search API (API key)
//! - `DuckDuckGoSearch`: scrapes the DuckDuckGo HTML endpoint (no key)

use super::http::body_preview;
use super::{Search, SearchError, SearchResult};
use crate::extraction::RateLimiter;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use scraper::{ElementRef, Html, Selector};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, warn};
use url::Url;

/// Minimum spacing between two DuckDuckGo requests
const DUCKDUCKGO_MIN_INTERVAL: Duration = Duration::from_secs(3);

/// Waits before each retry when DuckDuckGo serves its anomaly page
const DUCKDUCKGO_RETRY_DELAYS: [Duration; 3] = [
    Duration::from_secs(2),
    Duration::from_secs(5),
    Duration::from_secs(10),
];

/// Per-request bound used until the pipeline's timeout is applied
const DUCKDUCKGO_DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Class prefix of the challenge DuckDuckGo serves instead of results when it throttles
const DUCKDUCKGO_ANOMALY_MARKER: &str = "anomaly-modal";

/// Browser-like agent; the HTML endpoint rejects unknown clients more often
const DUCKDUCKGO_USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64; rv:128.0) Gecko/20100101 Firefox/128.0";

pub struct SerperSearch {
    client: Client,
    api_key: String,
    base_url: String,
}

#[derive(Deserialize)]
struct SerperResponse {
    #[serde(default)]
    organic: Vec<SerperHit>,
}

#[derive(Deserialize)]
struct SerperHit {
    link: Option<String>,
    title: Option<String>,
    snippet: Option<String>,
}

impl SerperSearch {
    pub fn new(client: Client, api_key: String, base_url: String) -> Self {
        Self {
            client,
            api_key,
            base_url,
        }
    }
}

#[async_trait]
impl Search for SerperSearch {
    fn name(&self) -> &'static str {
        "serper"
    }

    async fn search(
        &self,
        query: &str,
        max_results: usize,
    ) -> Result<Vec<SearchResult>, SearchError> {
        let response = self
            .client
            .post(format!("{}/search", self.base_url))
            .header("X-API-KEY", &self.api_key)
            .json(&json!({ "q": query, "num": max_results }))
            .send()
            .await
            .map_err(|e| SearchError::from_reqwest(self.name(), e))?;

        let body: SerperResponse = decode_json(self.name(), response).await?;

        Ok(collect_results(
            body.organic
                .into_iter()
                .map(|hit| (hit.link, hit.title, hit.snippet)),
            max_results,
        ))
    }
}

pub struct BraveSearch {
    client: Client,
    api_key: String,
    base_url: String,
}

#[derive(Deserialize)]
struct BraveResponse {
    web: Option<BraveWeb>,
}

#[derive(Deserialize)]
struct BraveWeb {
    #[serde(default)]
    results: Vec<BraveHit>,
}

#[derive(Deserialize)]
struct BraveHit {
    url: Option<String>,
    title: Option<String>,
    description: Option<String>,
}

impl BraveSearch {
    pub fn new(client: Client, api_key: String, base_url: String) -> Self {
        Self {
            client,
            api_key,
            base_url,
        }
    }
}

#[async_trait]
impl Search for BraveSearch {
    fn name(&self) -> &'static str {
        "brave"
    }

    async fn search(
        &self,
        query: &str,
        max_results: usize,
    ) -> Result<Vec<SearchResult>, SearchError> {
        let count = max_results.to_string();
        let response = self
            .client
            .get(format!("{}/res/v1/web/search", self.base_url))
            .query(&[
                ("q", query),
                ("count", count.as_str()),
                ("safesearch", "moderate"),
            ])
            .header("Accept", "application/json")
            .header("X-Subscription-Token", &self.api_key)
            .send()
            .await
            .map_err(|e| SearchError::from_reqwest(self.name(), e))?;

        let body: BraveResponse = decode_json(self.name(), response).await?;
        let hits = body.web.map(|web| web.results).unwrap_or_default();

        Ok(collect_results(
            hits.into_iter()
                .map(|hit| (hit.url, hit.title, hit.description)),
            max_results,
        ))
    }
}

pub struct DuckDuckGoSearch {
    client: Client,
    base_url: String,
    throttle: RateLimiter,
    retry_delays: Vec<Duration>,
    request_timeout: Duration,
}

impl DuckDuckGoSearch {
    pub fn new(client: Client, base_url: String) -> Self {
        Self {
            client,
            base_url,
            throttle: RateLimiter::new(DUCKDUCKGO_MIN_INTERVAL),
            retry_delays: DUCKDUCKGO_RETRY_DELAYS.to_vec(),
            request_timeout: DUCKDUCKGO_DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// Bounds each HTTP request; time spent queued for a slot is not counted
    pub fn with_request_timeout(mut self, request_timeout: Duration) -> Self {
        self.request_timeout = request_timeout;
        self
    }

    /// Overrides request spacing and anomaly retry waits
    pub fn with_timing(mut self, min_interval: Duration, retry_delays: Vec<Duration>) -> Self {
        self.throttle = RateLimiter::new(min_interval);
        self.retry_delays = retry_delays;
        self
    }

    /// Waits for a throttle slot, then fetches one result page within the
    /// request timeout
    async fn fetch_throttled(&self, query: &str) -> Result<String, SearchError> {
        let request_timeout = self.request_timeout;
        self.throttle
            .schedule(|| async move {
                match timeout(request_timeout, self.fetch_page(query)).await {
                    Ok(result) => result,
                    Err(_) => Err(SearchError::Timeout {
                        provider: self.name(),
                    }),
                }
            })
            .await
    }

    async fn fetch_page(&self, query: &str) -> Result<String, SearchError> {
        let response = self
            .client
            .get(format!("{}/html/", self.base_url))
            .query(&[("q", query)])
            .header(reqwest::header::USER_AGENT, DUCKDUCKGO_USER_AGENT)
            .send()
            .await
            .map_err(|e| SearchError::from_reqwest(self.name(), e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| SearchError::from_reqwest(self.name(), e))?;

        // DuckDuckGo throttles with a 202 challenge page as well as with 429
        if status == StatusCode::TOO_MANY_REQUESTS || body.contains(DUCKDUCKGO_ANOMALY_MARKER) {
            return Err(SearchError::RateLimited {
                provider: self.name(),
            });
        }

        if !status.is_success() {
            return Err(SearchError::Status {
                provider: self.name(),
                status: status.as_u16(),
                body: body_preview(&body),
            });
        }

        Ok(body)
    }
}

#[async_trait]
impl Search for DuckDuckGoSearch {
    fn name(&self) -> &'static str {
        "duckduckgo"
    }

    fn queues_requests(&self) -> bool {
        true
    }

    async fn search(
        &self,
        query: &str,
        max_results: usize,
    ) -> Result<Vec<SearchResult>, SearchError> {
        let mut attempt = 0;

        loop {
            match self.fetch_throttled(query).await {
                Ok(html) => return Ok(parse_duckduckgo_results(&html, max_results)),
                Err(SearchError::RateLimited { provider }) => {
                    let Some(delay) = self.retry_delays.get(attempt).copied() else {
                        return Err(SearchError::RateLimited { provider });
                    };
                    attempt += 1;
                    warn!(
                        "DuckDuckGo rate limited, retrying in {:?} (attempt {})",
                        delay, attempt
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// Extracts organic results from a DuckDuckGo HTML result page
///
/// Ads are skipped. Result links go through a `/l/?uddg=` redirect which is
/// unwrapped to the target URL.
pub(crate) fn parse_duckduckgo_results(html: &str, max_results: usize) -> Vec<SearchResult> {
    let document = Html::parse_document(html);
    let (Ok(result_selector), Ok(link_selector), Ok(snippet_selector)) = (
        Selector::parse("div.result"),
        Selector::parse("a.result__a"),
        Selector::parse(".result__snippet"),
    ) else {
        return Vec::new();
    };

    let hits = document
        .select(&result_selector)
        .filter(|result| !result.value().classes().any(|c| c == "result--ad"))
        .filter_map(|result| {
            let link = result.select(&link_selector).next()?;
            let url = link.value().attr("href").and_then(resolve_result_link);
            let title = element_text(link);
            let snippet = result.select(&snippet_selector).next().map(element_text);
            Some((url, Some(title), snippet))
        });

    let results = collect_results(hits, max_results);
    debug!("DuckDuckGo page yielded {} result(s)", results.len());
    results
}

fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Resolves a result href to the absolute target URL
fn resolve_result_link(href: &str) -> Option<String> {
    let base = Url::parse("https://duckduckgo.com/").ok()?;
    let resolved = base.join(href.trim()).ok()?;

    let target = if resolved.path().starts_with("/l/") {
        let (_, uddg) = resolved.query_pairs().find(|(key, _)| key == "uddg")?;
        Url::parse(&uddg).ok()?
    } else {
        resolved
    };

    matches!(target.scheme(), "http" | "https").then(|| target.to_string())
}

/// Builds results from raw hits, dropping hits without a URL
fn collect_results<I>(hits: I, max_results: usize) -> Vec<SearchResult>
where
    I: IntoIterator<Item = (Option<String>, Option<String>, Option<String>)>,
{
    hits.into_iter()
        .filter_map(|(url, title, snippet)| {
            let url = url.filter(|u| !u.trim().is_empty())?;
            Some(SearchResult {
                url,
                title: title.unwrap_or_default(),
                snippet: snippet.unwrap_or_default(),
            })
        })
        .take(max_results)
        .collect()
}

async fn decode_json<T: serde::de::DeserializeOwned>(
    provider: &'static str,
    response: reqwest::Response,
) -> Result<T, SearchError> {
    let status = response.status();

    if status == StatusCode::TOO_MANY_REQUESTS {
        return Err(SearchError::RateLimited { provider });
    }

    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(SearchError::Status {
            provider,
            status: status.as_u16(),
            body: body_preview(&body),
        });
    }

    let text = response
        .text()
        .await
        .map_err(|e| SearchError::from_reqwest(provider, e))?;
    serde_json::from_str(&text).map_err(|e| SearchError::Decode {
        provider,
        message: e.to_string(),
    })
}
