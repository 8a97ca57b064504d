//! Per-company processing
//!
//! An entity moves through search, rank, crawl, extract and store. Every step
//! is recorded in storage before it runs. Any failure stays inside this module
//! and ends up as a failed status row for that entity alone.

use crate::model::{AssetRecord, EntityState, LeaderRecord, PipelineStep};
use crate::pipeline::ranker::{rank_urls, ASSET_HINTS, LEADERSHIP_HINTS};
use crate::pipeline::stages::{CrawledText, Stages, PAGE_SEPARATOR};
use crate::providers::SearchResult;
use crate::storage::{Storage, StorageError};
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, info_span, warn, Instrument};

/// Reasons an entity stops before it is stored
#[derive(Debug, Error)]
enum EntityFailure {
    #[error("no search results for either query")]
    NoSearchResults,

    #[error("no usable content from any crawled page")]
    NoContent,

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Records step transitions and remembers the current step for error messages
struct StepTracker<'a> {
    storage: &'a dyn Storage,
    run_id: i64,
    entity_name: &'a str,
    step: PipelineStep,
}

impl StepTracker<'_> {
    fn enter(&mut self, step: PipelineStep) -> Result<(), StorageError> {
        self.step = step;
        self.storage.update_entity_status(
            self.run_id,
            self.entity_name,
            step,
            EntityState::Processing,
            None,
            None,
        )
    }
}

pub struct EntityProcessor {
    stages: Arc<Stages>,
    storage: Arc<dyn Storage>,
}

impl EntityProcessor {
    pub fn new(stages: Arc<Stages>, storage: Arc<dyn Storage>) -> Self {
        Self { stages, storage }
    }

    /// Processes one company within a run
    ///
    /// Returns true when the entity was stored. Never returns an error: a
    /// failure is written to the entity's status row instead.
    pub async fn process(&self, run_id: i64, entity_name: &str) -> bool {
        let span = info_span!("entity", run_id, company = %entity_name);
        self.process_inner(run_id, entity_name).instrument(span).await
    }

    async fn process_inner(&self, run_id: i64, entity_name: &str) -> bool {
        let mut tracker = StepTracker {
            storage: self.storage.as_ref(),
            run_id,
            entity_name,
            step: PipelineStep::Pending,
        };

        match self.run_steps(&mut tracker).await {
            Ok(entity_id) => {
                info!("Stored entity {}", entity_id);
                true
            }
            Err(e) => {
                let message = format!("{}: {}", tracker.step, e);
                error!("Entity failed at {}", message);
                self.mark_failed(run_id, entity_name, &message);
                false
            }
        }
    }

    /// Writes the terminal failure row for an entity
    ///
    /// A storage error here is logged; there is nowhere left to report it.
    pub fn mark_failed(&self, run_id: i64, entity_name: &str, message: &str) {
        if let Err(e) = self.storage.update_entity_status(
            run_id,
            entity_name,
            PipelineStep::Failed,
            EntityState::Failed,
            Some(message),
            None,
        ) {
            error!("Could not record failure for '{}': {}", entity_name, e);
        }
    }

    async fn run_steps(&self, tracker: &mut StepTracker<'_>) -> Result<i64, EntityFailure> {
        let name = tracker.entity_name;

        tracker.enter(PipelineStep::Searching)?;
        info!("Searching");
        let search = self.stages.search(name).await;
        if search.is_empty() {
            return Err(EntityFailure::NoSearchResults);
        }

        let leadership_urls = rank_urls(result_urls(search.leadership), LEADERSHIP_HINTS);
        let asset_urls = rank_urls(result_urls(search.assets), ASSET_HINTS);
        tracing::debug!("Ranked leadership URLs: {:?}", leadership_urls);
        tracing::debug!("Ranked asset URLs: {:?}", asset_urls);

        tracker.enter(PipelineStep::CrawlingLeadership)?;
        let leadership = self
            .stages
            .crawl_category("leadership", &leadership_urls)
            .await;

        tracker.enter(PipelineStep::CrawlingAssets)?;
        let assets = self.stages.crawl_category("assets", &asset_urls).await;

        if leadership.text.is_empty() && assets.text.is_empty() {
            return Err(EntityFailure::NoContent);
        }

        // A category with no text skips its extraction step entirely
        let mut leaders = Vec::new();
        if !leadership.text.is_empty() {
            tracker.enter(PipelineStep::ExtractingLeadership)?;
            leaders = self.extract_leaders(&leadership, name).await;
        }

        let mut asset_records = Vec::new();
        if !assets.text.is_empty() {
            tracker.enter(PipelineStep::ExtractingAssets)?;
            asset_records = self.extract_assets(&assets, name).await;
        }

        tracker.enter(PipelineStep::Storing)?;
        let entity_id = self.store(name, &leadership, &assets, &leaders, &asset_records)?;

        self.storage.update_entity_status(
            tracker.run_id,
            name,
            PipelineStep::Complete,
            EntityState::Complete,
            None,
            Some(entity_id),
        )?;

        Ok(entity_id)
    }

    async fn extract_leaders(&self, crawled: &CrawledText, name: &str) -> Vec<LeaderRecord> {
        match self.stages.extract_leadership(&crawled.text, name).await {
            Ok(extraction) => {
                info!("Extracted {} leader(s)", extraction.records.len());
                extraction.records
            }
            Err(e) => {
                warn!("Leadership extraction failed, storing no leaders: {}", e);
                Vec::new()
            }
        }
    }

    async fn extract_assets(&self, crawled: &CrawledText, name: &str) -> Vec<AssetRecord> {
        match self.stages.extract_assets(&crawled.text, name).await {
            Ok(extraction) => {
                info!("Extracted {} asset(s)", extraction.records.len());
                extraction.records
            }
            Err(e) => {
                warn!("Asset extraction failed, storing no assets: {}", e);
                Vec::new()
            }
        }
    }

    fn store(
        &self,
        name: &str,
        leadership: &CrawledText,
        assets: &CrawledText,
        leaders: &[LeaderRecord],
        asset_records: &[AssetRecord],
    ) -> Result<i64, StorageError> {
        let raw_source = [leadership.text.as_str(), assets.text.as_str()]
            .into_iter()
            .filter(|text| !text.is_empty())
            .collect::<Vec<_>>()
            .join(PAGE_SEPARATOR);

        let website_url = leadership
            .source_url
            .as_deref()
            .or(assets.source_url.as_deref());

        let entity = self
            .storage
            .upsert_entity(name, website_url, None, Some(&raw_source))?;

        self.storage
            .replace_leaders(entity.id, leaders, leadership.source_url.as_deref())?;
        self.storage
            .replace_assets(entity.id, asset_records, assets.source_url.as_deref())?;

        Ok(entity.id)
    }
}

pub(crate) fn result_urls(results: Vec<SearchResult>) -> Vec<String> {
    results.into_iter().map(|result| result.url).collect()
}
