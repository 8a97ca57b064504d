//! Integration tests for the extraction pipeline
//!
//! These tests drive the coordinator end-to-end against in-memory provider
//! fakes and an in-memory SQLite database.

use async_trait::async_trait;
use lode_finder::config::PipelineConfig;
use lode_finder::extraction::{ParseError, RateLimiter};
use lode_finder::model::normalize_name;
use lode_finder::providers::{
    build_http_client, Crawl, CrawlError, CrawlResult, DuckDuckGoSearch, Extraction,
    ExtractionError, Extractor, Providers, Search, SearchError, SearchResult,
};
use lode_finder::storage::{
    EntityDetail, EntityRecord, EntitySummary, RunDetail, SqliteStorage, Storage, StorageResult,
};
use lode_finder::{
    AssetRecord, AssetStatus, Coordinator, EntityState, LeaderRecord, LodeError, PipelineStep,
    RunStatus,
};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ===== Fakes =====

#[derive(Default)]
struct FakeSearch {
    leadership: HashMap<String, Vec<String>>,
    assets: HashMap<String, Vec<String>>,
    failing: HashSet<String>,
    queries: Mutex<Vec<String>>,
}

#[async_trait]
impl Search for FakeSearch {
    fn name(&self) -> &'static str {
        "fake-search"
    }

    async fn search(
        &self,
        query: &str,
        max_results: usize,
    ) -> Result<Vec<SearchResult>, SearchError> {
        self.queries.lock().unwrap().push(query.to_string());

        let company = normalize_name(query.split(" mining").next().unwrap_or_default());
        if self.failing.iter().any(|name| normalize_name(name) == company) {
            return Err(SearchError::RateLimited {
                provider: "fake-search",
            });
        }

        let table = if query.contains("leadership") {
            &self.leadership
        } else {
            &self.assets
        };

        Ok(table
            .iter()
            .find(|(name, _)| normalize_name(name) == company)
            .map(|(_, urls)| urls.clone())
            .unwrap_or_default()
            .into_iter()
            .take(max_results)
            .map(|url| SearchResult {
                url,
                title: String::new(),
                snippet: String::new(),
            })
            .collect())
    }
}

#[derive(Default)]
struct FakeCrawl {
    pages: HashMap<String, String>,
    delay: Duration,
    calls: Mutex<Vec<String>>,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

#[async_trait]
impl Crawl for FakeCrawl {
    async fn crawl(&self, url: &str) -> Result<CrawlResult, CrawlError> {
        self.calls.lock().unwrap().push(url.to_string());

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        match self.pages.get(url) {
            Some(markdown) => Ok(CrawlResult {
                markdown: markdown.clone(),
                title: String::new(),
            }),
            None => Err(CrawlError::Status {
                url: url.to_string(),
                status: 404,
            }),
        }
    }
}

#[derive(Default)]
struct FakeExtractor {
    failing: HashSet<String>,
    /// Rate-limit errors returned before the first success
    rate_limited: AtomicUsize,
    calls: Mutex<Vec<(String, String)>>,
    started: Mutex<Vec<Instant>>,
}

impl FakeExtractor {
    fn record(&self, category: &str, name: &str) -> Result<(), ExtractionError> {
        self.started.lock().unwrap().push(Instant::now());
        self.calls
            .lock()
            .unwrap()
            .push((category.to_string(), name.to_string()));

        if self
            .rate_limited
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(ExtractionError::RateLimited {
                provider: "fake-model",
                retry_after: Some(Duration::from_secs(1)),
            });
        }

        if self.failing.contains(name) {
            return Err(ExtractionError::Parse(ParseError {
                reason: "no JSON array or object found".to_string(),
                preview: "I could not find".to_string(),
            }));
        }

        Ok(())
    }
}

#[async_trait]
impl Extractor for FakeExtractor {
    async fn extract_leadership(
        &self,
        _text: &str,
        entity_name: &str,
    ) -> Result<Extraction<LeaderRecord>, ExtractionError> {
        self.record("leadership", entity_name)?;
        Ok(Extraction {
            records: vec![LeaderRecord {
                name: format!("{} CEO", entity_name),
                title: Some("Chief Executive Officer".to_string()),
                expertise_tags: vec!["Geology".to_string()],
                summary_bullets: vec![],
            }],
            raw: "[...]".to_string(),
        })
    }

    async fn extract_assets(
        &self,
        _text: &str,
        entity_name: &str,
    ) -> Result<Extraction<AssetRecord>, ExtractionError> {
        self.record("assets", entity_name)?;
        Ok(Extraction {
            records: vec![AssetRecord {
                name: "Copper Hill".to_string(),
                commodities: vec!["Copper".to_string()],
                status: AssetStatus::Operating,
                country: Some("Chile".to_string()),
                state_province: None,
                town: None,
                latitude: Some(-22.3),
                longitude: Some(-68.9),
            }],
            raw: "[...]".to_string(),
        })
    }
}

/// Storage that remembers every step transition it is asked to record
struct StepLog {
    inner: SqliteStorage,
    steps: Mutex<Vec<(String, PipelineStep)>>,
}

impl StepLog {
    fn new() -> Self {
        Self {
            inner: SqliteStorage::open_in_memory().unwrap(),
            steps: Mutex::new(Vec::new()),
        }
    }

    fn steps_for(&self, entity_name: &str) -> Vec<PipelineStep> {
        self.steps
            .lock()
            .unwrap()
            .iter()
            .filter(|(name, _)| name == entity_name)
            .map(|(_, step)| *step)
            .collect()
    }
}

impl Storage for StepLog {
    fn create_run(&self, input: &str, entity_names: &[String]) -> StorageResult<i64> {
        self.inner.create_run(input, entity_names)
    }

    fn update_run_status(
        &self,
        run_id: i64,
        status: RunStatus,
        error_summary: Option<&str>,
    ) -> StorageResult<()> {
        self.inner.update_run_status(run_id, status, error_summary)
    }

    fn get_run(&self, run_id: i64) -> StorageResult<RunDetail> {
        self.inner.get_run(run_id)
    }

    fn update_entity_status(
        &self,
        run_id: i64,
        entity_name: &str,
        step: PipelineStep,
        status: EntityState,
        error_message: Option<&str>,
        entity_id: Option<i64>,
    ) -> StorageResult<()> {
        self.steps
            .lock()
            .unwrap()
            .push((entity_name.to_string(), step));
        self.inner
            .update_entity_status(run_id, entity_name, step, status, error_message, entity_id)
    }

    fn upsert_entity(
        &self,
        name: &str,
        website_url: Option<&str>,
        description: Option<&str>,
        raw_source: Option<&str>,
    ) -> StorageResult<EntityRecord> {
        self.inner
            .upsert_entity(name, website_url, description, raw_source)
    }

    fn replace_leaders(
        &self,
        entity_id: i64,
        leaders: &[LeaderRecord],
        source_url: Option<&str>,
    ) -> StorageResult<()> {
        self.inner.replace_leaders(entity_id, leaders, source_url)
    }

    fn replace_assets(
        &self,
        entity_id: i64,
        assets: &[AssetRecord],
        source_url: Option<&str>,
    ) -> StorageResult<()> {
        self.inner.replace_assets(entity_id, assets, source_url)
    }

    fn get_entity(&self, entity_id: i64) -> StorageResult<EntityDetail> {
        self.inner.get_entity(entity_id)
    }

    fn list_entities(&self) -> StorageResult<Vec<EntitySummary>> {
        self.inner.list_entities()
    }
}

// ===== Harness =====

struct Harness {
    coordinator: Arc<Coordinator>,
    storage: Arc<SqliteStorage>,
    search: Arc<FakeSearch>,
    crawl: Arc<FakeCrawl>,
    extractor: Arc<FakeExtractor>,
}

fn test_config() -> PipelineConfig {
    PipelineConfig {
        min_content_length: 20,
        concurrent_companies: 2,
        ..PipelineConfig::default()
    }
}

fn harness(
    search: FakeSearch,
    crawl: FakeCrawl,
    extractor: FakeExtractor,
    config: &PipelineConfig,
) -> Harness {
    harness_with_limiter(search, crawl, extractor, config, Duration::ZERO)
}

fn harness_with_limiter(
    search: FakeSearch,
    crawl: FakeCrawl,
    extractor: FakeExtractor,
    config: &PipelineConfig,
    min_interval: Duration,
) -> Harness {
    let search = Arc::new(search);
    let crawl = Arc::new(crawl);
    let extractor = Arc::new(extractor);
    let storage = Arc::new(SqliteStorage::open_in_memory().unwrap());

    let providers = Providers::new(search.clone(), crawl.clone(), extractor.clone());
    let shared: Arc<dyn Storage> = storage.clone();
    let coordinator = Arc::new(Coordinator::with_limiter(
        providers,
        shared,
        config,
        Arc::new(RateLimiter::new(min_interval)),
    ));

    Harness {
        coordinator,
        storage,
        search,
        crawl,
        extractor,
    }
}

fn page(topic: &str) -> String {
    format!(
        "# {}\n\n{}",
        topic,
        "Open pit copper operation with a long mine life. ".repeat(4)
    )
}

fn urls(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

/// A company with one leadership page and one asset page, both crawlable
fn add_company(search: &mut FakeSearch, crawl: &mut FakeCrawl, name: &str) {
    let slug = name.to_lowercase().replace(' ', "-");
    let leadership_url = format!("https://{}.com/about/leadership", slug);
    let asset_url = format!("https://{}.com/operations", slug);

    crawl.pages.insert(leadership_url.clone(), page("Leadership"));
    crawl.pages.insert(asset_url.clone(), page("Operations"));
    search.leadership.insert(name.to_string(), vec![leadership_url]);
    search.assets.insert(name.to_string(), vec![asset_url]);
}

// ===== Tests =====

#[tokio::test]
async fn test_acme_corp_with_assets_only() {
    let asset_urls = urls(&[
        "https://acme.com/news",
        "https://acme.com/operations/mines",
        "https://acme.com/projects",
    ]);

    let mut search = FakeSearch::default();
    search.assets.insert("Acme Corp".to_string(), asset_urls.clone());

    let mut crawl = FakeCrawl::default();
    for url in &asset_urls {
        crawl.pages.insert(url.clone(), page(url));
    }

    let h = harness(search, crawl, FakeExtractor::default(), &test_config());
    let outcome = h.coordinator.ingest("Acme Corp").await.unwrap();

    assert_eq!(outcome.status, RunStatus::Completed);
    assert_eq!(outcome.failed, 0);
    assert_eq!(outcome.error_summary, None);

    // Crawled in ranked order, nothing for the empty leadership list
    assert_eq!(
        *h.crawl.calls.lock().unwrap(),
        urls(&[
            "https://acme.com/operations/mines",
            "https://acme.com/projects",
            "https://acme.com/news",
        ])
    );
    assert_eq!(
        *h.extractor.calls.lock().unwrap(),
        vec![("assets".to_string(), "Acme Corp".to_string())]
    );

    let run = h.storage.get_run(outcome.run_id).unwrap();
    assert_eq!(run.run.status, RunStatus::Completed);
    let status = &run.entities[0];
    assert_eq!(status.step, PipelineStep::Complete);
    assert_eq!(status.status, EntityState::Complete);

    let entity = h.storage.get_entity(status.entity_id.unwrap()).unwrap();
    assert!(entity.leaders.is_empty());
    assert_eq!(entity.assets.len(), 1);
    assert_eq!(entity.assets[0].asset.name, "Copper Hill");
    assert_eq!(
        entity.assets[0].source_url.as_deref(),
        Some("https://acme.com/operations/mines")
    );
    assert_eq!(
        entity.entity.website_url.as_deref(),
        Some("https://acme.com/operations/mines")
    );
}

#[tokio::test]
async fn test_partial_run_when_some_companies_fail() {
    let mut search = FakeSearch::default();
    let mut crawl = FakeCrawl::default();
    for name in ["Alpha", "Bravo", "Charlie"] {
        add_company(&mut search, &mut crawl, name);
    }
    search.failing.insert("Delta".to_string());
    search.failing.insert("Echo".to_string());

    let h = harness(search, crawl, FakeExtractor::default(), &test_config());
    let outcome = h
        .coordinator
        .ingest("Alpha, Bravo, Charlie, Delta, Echo")
        .await
        .unwrap();

    assert_eq!(outcome.status, RunStatus::Partial);
    assert_eq!(outcome.total, 5);
    assert_eq!(outcome.failed, 2);
    assert_eq!(outcome.error_summary.as_deref(), Some("2/5 companies failed"));

    let run = h.storage.get_run(outcome.run_id).unwrap();
    assert_eq!(
        run.run.error_summary.as_deref(),
        Some("2/5 companies failed")
    );
    assert!(run.run.completed_at.is_some());

    for status in &run.entities {
        if status.entity_name == "Delta" || status.entity_name == "Echo" {
            assert_eq!(status.step, PipelineStep::Failed);
            assert_eq!(status.status, EntityState::Failed);
            let message = status.error_message.as_deref().unwrap();
            assert!(message.starts_with("searching:"), "got {}", message);
        } else {
            assert_eq!(status.step, PipelineStep::Complete);
            assert!(status.entity_id.is_some());
        }
    }

    assert_eq!(h.storage.list_entities().unwrap().len(), 3);
}

#[tokio::test]
async fn test_run_fails_when_every_company_fails() {
    // No search results at all
    let h = harness(
        FakeSearch::default(),
        FakeCrawl::default(),
        FakeExtractor::default(),
        &test_config(),
    );

    let outcome = h.coordinator.ingest("A, B, C").await.unwrap();

    assert_eq!(outcome.status, RunStatus::Failed);
    assert_eq!(outcome.error_summary.as_deref(), Some("3/3 companies failed"));
    assert!(h.crawl.calls.lock().unwrap().is_empty());
    assert!(h.storage.list_entities().unwrap().is_empty());

    // Two queries per company
    assert_eq!(h.search.queries.lock().unwrap().len(), 6);
}

#[tokio::test]
async fn test_short_pages_fail_entity_at_crawl() {
    let mut search = FakeSearch::default();
    search.leadership.insert(
        "Tiny Mines".to_string(),
        urls(&["https://tiny.com/team", "https://tiny.com/missing"]),
    );
    search
        .assets
        .insert("Tiny Mines".to_string(), urls(&["https://tiny.com/mines"]));

    let mut crawl = FakeCrawl::default();
    crawl
        .pages
        .insert("https://tiny.com/team".to_string(), "Coming soon".to_string());
    crawl
        .pages
        .insert("https://tiny.com/mines".to_string(), "   \n  ".to_string());

    let h = harness(search, crawl, FakeExtractor::default(), &test_config());
    let outcome = h.coordinator.ingest("Tiny Mines").await.unwrap();

    assert_eq!(outcome.status, RunStatus::Failed);
    assert_eq!(h.crawl.calls.lock().unwrap().len(), 3);
    assert!(h.extractor.calls.lock().unwrap().is_empty());

    let run = h.storage.get_run(outcome.run_id).unwrap();
    let message = run.entities[0].error_message.as_deref().unwrap();
    assert!(message.starts_with("crawling_assets:"), "got {}", message);
}

#[tokio::test]
async fn test_crawl_stops_at_url_limit() {
    let leadership = urls(&[
        "https://big.com/a",
        "https://big.com/b",
        "https://big.com/c",
        "https://big.com/d",
    ]);

    let mut search = FakeSearch::default();
    search
        .leadership
        .insert("Big Co".to_string(), leadership.clone());

    // Only the last URL has content, and it is past the limit
    let mut crawl = FakeCrawl::default();
    crawl
        .pages
        .insert("https://big.com/d".to_string(), page("Board"));

    let config = PipelineConfig {
        max_urls_to_crawl_per_topic: 2,
        ..test_config()
    };
    let h = harness(search, crawl, FakeExtractor::default(), &config);
    let outcome = h.coordinator.ingest("Big Co").await.unwrap();

    assert_eq!(outcome.status, RunStatus::Failed);
    assert_eq!(
        *h.crawl.calls.lock().unwrap(),
        urls(&["https://big.com/a", "https://big.com/b"])
    );
}

#[tokio::test]
async fn test_extraction_failure_still_stores_entity() {
    let mut search = FakeSearch::default();
    let mut crawl = FakeCrawl::default();
    add_company(&mut search, &mut crawl, "Stubborn Gold");

    let extractor = FakeExtractor {
        failing: HashSet::from(["Stubborn Gold".to_string()]),
        ..FakeExtractor::default()
    };

    let h = harness(search, crawl, extractor, &test_config());
    let outcome = h.coordinator.ingest("Stubborn Gold").await.unwrap();

    assert_eq!(outcome.status, RunStatus::Completed);
    assert_eq!(h.extractor.calls.lock().unwrap().len(), 2);

    let run = h.storage.get_run(outcome.run_id).unwrap();
    let entity = h
        .storage
        .get_entity(run.entities[0].entity_id.unwrap())
        .unwrap();

    assert!(entity.leaders.is_empty());
    assert!(entity.assets.is_empty());
    assert_eq!(
        entity.entity.website_url.as_deref(),
        Some("https://stubborn-gold.com/about/leadership")
    );

    // Both categories are kept as raw source
    let raw = entity.entity.raw_source.unwrap();
    assert!(raw.contains("# Leadership"));
    assert!(raw.contains("\n\n---\n\n# Operations"));
}

#[tokio::test(start_paused = true)]
async fn test_rate_limited_extraction_is_retried() {
    let mut search = FakeSearch::default();
    let mut crawl = FakeCrawl::default();
    add_company(&mut search, &mut crawl, "Busy Copper");

    let extractor = FakeExtractor {
        rate_limited: AtomicUsize::new(2),
        ..FakeExtractor::default()
    };

    let h = harness(search, crawl, extractor, &test_config());
    let outcome = h.coordinator.ingest("Busy Copper").await.unwrap();

    assert_eq!(outcome.status, RunStatus::Completed);

    // Two rate-limited leadership attempts, then one success per category
    let calls = h.extractor.calls.lock().unwrap().clone();
    assert_eq!(calls.len(), 4);
    assert_eq!(calls.iter().filter(|(c, _)| c == "leadership").count(), 3);

    let run = h.storage.get_run(outcome.run_id).unwrap();
    let entity = h
        .storage
        .get_entity(run.entities[0].entity_id.unwrap())
        .unwrap();
    assert_eq!(entity.leaders.len(), 1);
    assert_eq!(entity.assets.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_rate_limit_without_retry_degrades_category() {
    let mut search = FakeSearch::default();
    let mut crawl = FakeCrawl::default();
    add_company(&mut search, &mut crawl, "Busy Copper");

    let extractor = FakeExtractor {
        rate_limited: AtomicUsize::new(1),
        ..FakeExtractor::default()
    };

    let config = PipelineConfig {
        retry_on_429: false,
        ..test_config()
    };
    let h = harness(search, crawl, extractor, &config);
    let outcome = h.coordinator.ingest("Busy Copper").await.unwrap();

    assert_eq!(outcome.status, RunStatus::Completed);
    assert_eq!(h.extractor.calls.lock().unwrap().len(), 2);

    let run = h.storage.get_run(outcome.run_id).unwrap();
    let entity = h
        .storage
        .get_entity(run.entities[0].entity_id.unwrap())
        .unwrap();
    assert!(entity.leaders.is_empty());
    assert_eq!(entity.assets.len(), 1);
}

#[tokio::test]
async fn test_concurrency_is_bounded() {
    let names = ["One", "Two", "Three", "Four", "Five"];

    let mut search = FakeSearch::default();
    let mut crawl = FakeCrawl {
        delay: Duration::from_millis(30),
        ..FakeCrawl::default()
    };
    for name in names {
        add_company(&mut search, &mut crawl, name);
    }

    let h = harness(search, crawl, FakeExtractor::default(), &test_config());
    let outcome = h.coordinator.ingest(&names.join(", ")).await.unwrap();

    assert_eq!(outcome.status, RunStatus::Completed);
    assert_eq!(outcome.total, 5);

    // Crawls within one company are sequential, so overlap comes from companies
    let peak = h.crawl.peak.load(Ordering::SeqCst);
    assert!((1..=2).contains(&peak), "peak concurrency was {}", peak);
}

#[tokio::test]
async fn test_submit_rejects_empty_input() {
    let h = harness(
        FakeSearch::default(),
        FakeCrawl::default(),
        FakeExtractor::default(),
        &test_config(),
    );

    let result = h.coordinator.submit(" ,  , ");
    assert!(matches!(result, Err(LodeError::InvalidInput(_))));

    // No run was created
    assert!(h.storage.get_run(1).is_err());
}

#[tokio::test]
async fn test_submit_dedupes_names() {
    let h = harness(
        FakeSearch::default(),
        FakeCrawl::default(),
        FakeExtractor::default(),
        &test_config(),
    );

    let (run_id, names) = h.coordinator.submit("BHP, bhp ,  Rio Tinto").unwrap();
    assert_eq!(names, urls(&["BHP", "Rio Tinto"]));

    let run = h.storage.get_run(run_id).unwrap();
    assert_eq!(run.run.status, RunStatus::Processing);
    assert_eq!(run.entities.len(), 2);
    assert!(run
        .entities
        .iter()
        .all(|e| e.step == PipelineStep::Pending && e.status == EntityState::Pending));
}

#[tokio::test]
async fn test_spawned_run_reaches_terminal_status() {
    let mut search = FakeSearch::default();
    let mut crawl = FakeCrawl::default();
    add_company(&mut search, &mut crawl, "Alpha");

    let h = harness(search, crawl, FakeExtractor::default(), &test_config());
    let (run_id, names) = h.coordinator.submit("Alpha, Ghost").unwrap();

    Arc::clone(&h.coordinator)
        .spawn_run(run_id, names)
        .await
        .unwrap();

    let run = h.storage.get_run(run_id).unwrap();
    assert_eq!(run.run.status, RunStatus::Partial);
    assert_eq!(run.run.error_summary.as_deref(), Some("1/2 companies failed"));
}

#[tokio::test]
async fn test_run_pipeline_errors_for_unknown_run() {
    let h = harness(
        FakeSearch::default(),
        FakeCrawl::default(),
        FakeExtractor::default(),
        &test_config(),
    );

    let result = h.coordinator.run_pipeline(99, urls(&["Nobody"])).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_second_run_updates_same_entity() {
    let mut search = FakeSearch::default();
    let mut crawl = FakeCrawl::default();
    add_company(&mut search, &mut crawl, "Rio Tinto");

    let h = harness(search, crawl, FakeExtractor::default(), &test_config());
    let first = h.coordinator.ingest("Rio Tinto").await.unwrap();
    let second = h.coordinator.ingest("  rio   tinto ").await.unwrap();

    assert_ne!(first.run_id, second.run_id);

    let entities = h.storage.list_entities().unwrap();
    assert_eq!(entities.len(), 1);
    assert_eq!(entities[0].leader_count, 1);
    assert_eq!(entities[0].asset_count, 1);
}

#[tokio::test]
async fn test_debug_entity_reports_every_stage() {
    let asset_urls = urls(&["https://acme.com/news", "https://acme.com/projects"]);

    let mut search = FakeSearch::default();
    search.assets.insert("Acme Corp".to_string(), asset_urls);

    let mut crawl = FakeCrawl::default();
    crawl
        .pages
        .insert("https://acme.com/projects".to_string(), page("Projects"));

    let h = harness(search, crawl, FakeExtractor::default(), &test_config());
    let report = h.coordinator.debug_entity("Acme Corp").await;

    assert_eq!(report.company, "Acme Corp");
    assert!(report.search_errors.is_empty());

    assert!(report.leadership.search_urls.is_empty());
    assert!(report.leadership.extraction.skipped);
    assert_eq!(report.leadership.crawl.pages_attempted, 0);

    assert_eq!(
        report.assets.ranked_urls,
        urls(&["https://acme.com/projects", "https://acme.com/news"])
    );
    assert_eq!(report.assets.crawl.pages_attempted, 2);
    assert_eq!(report.assets.crawl.pages_used, 1);
    assert_eq!(
        report.assets.crawl.source_url.as_deref(),
        Some("https://acme.com/projects")
    );
    assert!(!report.assets.extraction.skipped);
    assert_eq!(report.assets.extraction.parsed.len(), 1);
    assert_eq!(report.assets.extraction.raw.as_deref(), Some("[...]"));

    // Nothing is written
    assert!(h.storage.list_entities().unwrap().is_empty());

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["assets"]["extraction"]["parsed"][0]["name"], "Copper Hill");
}

#[tokio::test]
async fn test_empty_category_skips_its_extraction_step() {
    let mut search = FakeSearch::default();
    search.assets.insert(
        "Acme Corp".to_string(),
        urls(&["https://acme.com/operations"]),
    );

    let mut crawl = FakeCrawl::default();
    crawl
        .pages
        .insert("https://acme.com/operations".to_string(), page("Operations"));

    let storage = Arc::new(StepLog::new());
    let shared: Arc<dyn Storage> = storage.clone();
    let providers = Providers::new(
        Arc::new(search),
        Arc::new(crawl),
        Arc::new(FakeExtractor::default()),
    );
    let coordinator = Coordinator::with_limiter(
        providers,
        shared,
        &test_config(),
        Arc::new(RateLimiter::new(Duration::ZERO)),
    );

    let outcome = coordinator.ingest("Acme Corp").await.unwrap();
    assert_eq!(outcome.status, RunStatus::Completed);

    assert_eq!(
        storage.steps_for("Acme Corp"),
        vec![
            PipelineStep::Searching,
            PipelineStep::CrawlingLeadership,
            PipelineStep::CrawlingAssets,
            PipelineStep::ExtractingAssets,
            PipelineStep::Storing,
            PipelineStep::Complete,
        ]
    );
}

#[tokio::test]
async fn test_page_at_minimum_length_is_kept_untrimmed() {
    // Exactly 20 characters, two of them leading newlines
    let markdown = format!("\n\n{}", "x".repeat(18));

    let mut search = FakeSearch::default();
    search
        .leadership
        .insert("Edge Metals".to_string(), urls(&["https://edge.com/team"]));

    let mut crawl = FakeCrawl::default();
    crawl
        .pages
        .insert("https://edge.com/team".to_string(), markdown.clone());

    let h = harness(search, crawl, FakeExtractor::default(), &test_config());
    let outcome = h.coordinator.ingest("Edge Metals").await.unwrap();

    assert_eq!(outcome.status, RunStatus::Completed);

    let run = h.storage.get_run(outcome.run_id).unwrap();
    let entity = h
        .storage
        .get_entity(run.entities[0].entity_id.unwrap())
        .unwrap();
    assert_eq!(entity.entity.raw_source.as_deref(), Some(markdown.as_str()));
}

#[tokio::test]
async fn test_debug_reports_length_before_cap() {
    let mut search = FakeSearch::default();
    search.assets.insert(
        "Acme Corp".to_string(),
        urls(&["https://acme.com/projects", "https://acme.com/mines"]),
    );

    let mut crawl = FakeCrawl::default();
    crawl
        .pages
        .insert("https://acme.com/projects".to_string(), page("Projects"));
    crawl
        .pages
        .insert("https://acme.com/mines".to_string(), page("Mines"));

    let config = PipelineConfig {
        max_content_length: 100,
        ..test_config()
    };
    let h = harness(search, crawl, FakeExtractor::default(), &config);
    let report = h.coordinator.debug_entity("Acme Corp").await;

    let merged = page("Projects").chars().count()
        + "\n\n---\n\n".len()
        + page("Mines").chars().count();
    assert_eq!(report.assets.crawl.pages_used, 2);
    assert_eq!(report.assets.crawl.content_length, merged);
    assert!(report.assets.crawl.content_preview.chars().count() <= 100);
}

#[tokio::test(start_paused = true)]
async fn test_extractor_calls_are_spaced_across_companies() {
    let names = ["North", "South", "East"];

    let mut search = FakeSearch::default();
    let mut crawl = FakeCrawl::default();
    for name in names {
        add_company(&mut search, &mut crawl, name);
    }

    let config = PipelineConfig {
        concurrent_companies: 3,
        ..test_config()
    };
    let interval = Duration::from_secs(2);
    let h = harness_with_limiter(search, crawl, FakeExtractor::default(), &config, interval);

    let outcome = h.coordinator.ingest(&names.join(", ")).await.unwrap();
    assert_eq!(outcome.status, RunStatus::Completed);

    let mut started = h.extractor.started.lock().unwrap().clone();
    assert_eq!(started.len(), 6);
    started.sort();
    for pair in started.windows(2) {
        assert!(
            pair[1] - pair[0] >= interval,
            "extractor calls {:?} apart",
            pair[1] - pair[0]
        );
    }
}

const DUCKDUCKGO_PAGE: &str = r#"<html><body>
<div class="result results_links">
  <h2><a class="result__a" href="https://shared.com/about/leadership">Leadership</a></h2>
</div>
<div class="result results_links">
  <h2><a class="result__a" href="https://shared.com/operations">Operations</a></h2>
</div>
</body></html>"#;

#[tokio::test]
async fn test_queued_duckduckgo_queries_do_not_time_out() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/html/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(DUCKDUCKGO_PAGE))
        .mount(&mock_server)
        .await;

    // Sixteen queries spaced 100ms apart take longer than one request timeout
    let config = PipelineConfig {
        request_timeout_ms: 1000,
        concurrent_companies: 8,
        ..test_config()
    };
    let search = DuckDuckGoSearch::new(
        build_http_client(Duration::from_secs(5)).unwrap(),
        mock_server.uri(),
    )
    .with_timing(Duration::from_millis(100), vec![])
    .with_request_timeout(config.request_timeout());

    let mut crawl = FakeCrawl::default();
    crawl.pages.insert(
        "https://shared.com/about/leadership".to_string(),
        page("Leadership"),
    );
    crawl
        .pages
        .insert("https://shared.com/operations".to_string(), page("Operations"));

    let storage = Arc::new(SqliteStorage::open_in_memory().unwrap());
    let shared: Arc<dyn Storage> = storage.clone();
    let coordinator = Coordinator::with_limiter(
        Providers::new(
            Arc::new(search),
            Arc::new(crawl),
            Arc::new(FakeExtractor::default()),
        ),
        shared,
        &config,
        Arc::new(RateLimiter::new(Duration::ZERO)),
    );

    let outcome = coordinator.ingest("A, B, C, D, E, F, G, H").await.unwrap();

    assert_eq!(outcome.status, RunStatus::Completed);
    assert_eq!(outcome.failed, 0);
    assert_eq!(mock_server.received_requests().await.unwrap().len(), 16);
}
