//! Single-company dry run
//!
//! Runs the same search, rank, crawl and extraction logic as a real run but
//! writes nothing. Every intermediate result is kept so a bad extraction can
//! be traced back to the page or query that caused it.

use crate::extraction::truncate_chars;
use crate::model::{AssetRecord, LeaderRecord};
use crate::pipeline::processor::result_urls;
use crate::pipeline::ranker::{rank_urls, ASSET_HINTS, LEADERSHIP_HINTS};
use crate::pipeline::stages::{assets_query, leadership_query, CrawledText, Stages};
use crate::providers::{Extraction, ExtractionError};
use serde::Serialize;

/// Characters of crawled text kept in the report
const CONTENT_PREVIEW_CHARS: usize = 500;

/// Everything the pipeline saw for one company
#[derive(Debug, Serialize)]
pub struct DebugReport {
    pub company: String,
    pub search_errors: Vec<String>,
    pub leadership: CategoryReport<LeaderRecord>,
    pub assets: CategoryReport<AssetRecord>,
}

/// One category's path through search, crawl and extraction
#[derive(Debug, Serialize)]
pub struct CategoryReport<T> {
    pub query: String,
    /// URLs in the order the search provider returned them
    pub search_urls: Vec<String>,
    /// URLs in crawl order
    pub ranked_urls: Vec<String>,
    pub crawl: CrawlReport,
    pub extraction: ExtractionReport<T>,
}

#[derive(Debug, Serialize)]
pub struct CrawlReport {
    /// Merged length before the overall cap
    pub content_length: usize,
    pub pages_attempted: usize,
    pub pages_used: usize,
    pub source_url: Option<String>,
    pub content_preview: String,
}

impl From<&CrawledText> for CrawlReport {
    fn from(crawled: &CrawledText) -> Self {
        Self {
            content_length: crawled.content_length,
            pages_attempted: crawled.pages_attempted,
            pages_used: crawled.pages_used,
            source_url: crawled.source_url.clone(),
            content_preview: truncate_chars(&crawled.text, CONTENT_PREVIEW_CHARS).to_string(),
        }
    }
}

/// Model output for one category
#[derive(Debug, Serialize)]
pub struct ExtractionReport<T> {
    /// True when there was no content to send to the model
    pub skipped: bool,
    /// Raw model text, or the start of it when parsing failed
    pub raw: Option<String>,
    pub parsed: Vec<T>,
    pub error: Option<String>,
}

impl<T> ExtractionReport<T> {
    fn skipped() -> Self {
        Self {
            skipped: true,
            raw: None,
            parsed: Vec::new(),
            error: None,
        }
    }

    fn from_result(result: Result<Extraction<T>, ExtractionError>) -> Self {
        match result {
            Ok(extraction) => Self {
                skipped: false,
                raw: Some(extraction.raw),
                parsed: extraction.records,
                error: None,
            },
            Err(e) => {
                let raw = match &e {
                    ExtractionError::Parse(parse) => Some(parse.preview.clone()),
                    _ => None,
                };
                Self {
                    skipped: false,
                    raw,
                    parsed: Vec::new(),
                    error: Some(e.to_string()),
                }
            }
        }
    }
}

pub(crate) async fn debug_entity(stages: &Stages, company: &str) -> DebugReport {
    tracing::info!("Debug run for '{}'", company);

    let search = stages.search(company).await;
    let leadership_search = result_urls(search.leadership);
    let asset_search = result_urls(search.assets);

    let leadership_ranked = rank_urls(leadership_search.clone(), LEADERSHIP_HINTS);
    let asset_ranked = rank_urls(asset_search.clone(), ASSET_HINTS);

    let leadership_text = stages
        .crawl_category("leadership", &leadership_ranked)
        .await;
    let asset_text = stages.crawl_category("assets", &asset_ranked).await;

    let leadership_extraction = if leadership_text.text.is_empty() {
        ExtractionReport::skipped()
    } else {
        ExtractionReport::from_result(
            stages
                .extract_leadership(&leadership_text.text, company)
                .await,
        )
    };

    let asset_extraction = if asset_text.text.is_empty() {
        ExtractionReport::skipped()
    } else {
        ExtractionReport::from_result(stages.extract_assets(&asset_text.text, company).await)
    };

    DebugReport {
        company: company.to_string(),
        search_errors: search.errors,
        leadership: CategoryReport {
            query: leadership_query(company),
            search_urls: leadership_search,
            ranked_urls: leadership_ranked,
            crawl: CrawlReport::from(&leadership_text),
            extraction: leadership_extraction,
        },
        assets: CategoryReport {
            query: assets_query(company),
            search_urls: asset_search,
            ranked_urls: asset_ranked,
            crawl: CrawlReport::from(&asset_text),
            extraction: asset_extraction,
        },
    }
}
