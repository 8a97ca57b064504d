//! Run coordinator - creates runs and drives entity processing
//!
//! This module owns the run aggregate:
//! - Parsing raw input into company names and creating the run
//! - Processing entities with bounded concurrency
//! - Computing and persisting the terminal run status
//! - Supervising background runs so a crashed run is still marked failed

use crate::config::PipelineConfig;
use crate::extraction::{RateLimiter, RetryPolicy};
use crate::model::{parse_entity_names, RunStatus};
use crate::pipeline::debug::{debug_entity, DebugReport};
use crate::pipeline::processor::EntityProcessor;
use crate::pipeline::stages::Stages;
use crate::providers::Providers;
use crate::storage::Storage;
use crate::{LodeError, Result};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::{JoinHandle, JoinSet};
use tracing::{error, info};

/// Final state of a finished run
#[derive(Debug, Clone, Serialize)]
pub struct RunOutcome {
    pub run_id: i64,
    pub status: RunStatus,
    pub total: usize,
    pub failed: usize,
    pub error_summary: Option<String>,
}

/// Main pipeline coordinator structure
pub struct Coordinator {
    stages: Arc<Stages>,
    processor: Arc<EntityProcessor>,
    storage: Arc<dyn Storage>,
    concurrency: usize,
}

impl Coordinator {
    /// Creates a coordinator with its own rate limiter sized from the config
    pub fn new(providers: Providers, storage: Arc<dyn Storage>, config: &PipelineConfig) -> Self {
        let limiter = Arc::new(RateLimiter::per_minute(config.llm_requests_per_minute));
        Self::with_limiter(providers, storage, config, limiter)
    }

    /// Creates a coordinator that shares an existing rate limiter
    pub fn with_limiter(
        providers: Providers,
        storage: Arc<dyn Storage>,
        config: &PipelineConfig,
        limiter: Arc<RateLimiter>,
    ) -> Self {
        let stages = Arc::new(Stages::new(
            providers,
            limiter,
            RetryPolicy::from_config(config),
            config.clone(),
        ));
        let processor = Arc::new(EntityProcessor::new(
            Arc::clone(&stages),
            Arc::clone(&storage),
        ));

        Self {
            stages,
            processor,
            storage,
            concurrency: config.concurrent_companies.max(1),
        }
    }

    /// Parses `input` and creates a run for the names it contains
    ///
    /// # Returns
    ///
    /// * `Ok((run_id, names))` - The new run and the names it will process
    /// * `Err(LodeError::InvalidInput)` - The input held no names; no run is created
    pub fn submit(&self, input: &str) -> Result<(i64, Vec<String>)> {
        let names = parse_entity_names(input);
        if names.is_empty() {
            return Err(LodeError::InvalidInput(
                "no company names in input".to_string(),
            ));
        }

        let run_id = self.storage.create_run(input, &names)?;
        info!("Created run {} for {} company(ies)", run_id, names.len());
        Ok((run_id, names))
    }

    /// Creates a run and processes it to completion
    pub async fn ingest(&self, input: &str) -> Result<RunOutcome> {
        let (run_id, names) = self.submit(input)?;
        self.run_pipeline(run_id, names).await
    }

    /// Processes every entity of a run and records the terminal status
    ///
    /// At most `concurrent_companies` entities are in flight. An entity that
    /// fails, or whose task panics, counts as failed without stopping the
    /// others.
    pub async fn run_pipeline(&self, run_id: i64, names: Vec<String>) -> Result<RunOutcome> {
        let total = names.len();
        info!(
            "Starting run {} ({} companies, concurrency {})",
            run_id, total, self.concurrency
        );

        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let mut tasks = JoinSet::new();

        for name in names {
            let permit = Arc::clone(&semaphore)
                .acquire_owned()
                .await
                .map_err(|e| LodeError::Task(e.to_string()))?;
            let processor = Arc::clone(&self.processor);

            tasks.spawn(async move {
                let _permit = permit;

                // Processing runs in its own task so a panic is tied to this entity
                let worker = Arc::clone(&processor);
                let entity_name = name.clone();
                let handle =
                    tokio::spawn(async move { worker.process(run_id, &entity_name).await });

                match handle.await {
                    Ok(stored) => stored,
                    Err(e) => {
                        error!("Task for '{}' aborted: {}", name, e);
                        processor.mark_failed(run_id, &name, &format!("task aborted: {}", e));
                        false
                    }
                }
            });
        }

        let mut failed = 0;
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(true) => {}
                Ok(false) => failed += 1,
                Err(e) => {
                    error!("Entity supervisor task failed: {}", e);
                    failed += 1;
                }
            }
        }

        let (status, error_summary) = RunStatus::from_outcomes(total, failed);
        self.storage
            .update_run_status(run_id, status, error_summary.as_deref())?;

        info!(
            "Run {} finished: {} ({}/{} failed)",
            run_id, status, failed, total
        );

        Ok(RunOutcome {
            run_id,
            status,
            total,
            failed,
            error_summary,
        })
    }

    /// Starts a run in the background
    ///
    /// The returned handle resolves once the run is terminal. If the run
    /// errors or panics, the failure is logged and the run is marked failed
    /// with the error message.
    pub fn spawn_run(self: Arc<Self>, run_id: i64, names: Vec<String>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let coordinator = Arc::clone(&self);
            let run = tokio::spawn(async move { coordinator.run_pipeline(run_id, names).await });

            let failure = match run.await {
                Ok(Ok(_)) => None,
                Ok(Err(e)) => Some(e.to_string()),
                Err(e) => Some(format!("run task aborted: {}", e)),
            };

            if let Some(message) = failure {
                error!("Run {} failed: {}", run_id, message);
                if let Err(e) =
                    self.storage
                        .update_run_status(run_id, RunStatus::Failed, Some(&message))
                {
                    error!("Could not mark run {} failed: {}", run_id, e);
                }
            }
        })
    }

    /// Runs the pipeline for one company without touching storage
    pub async fn debug_entity(&self, company: &str) -> DebugReport {
        debug_entity(&self.stages, company.trim()).await
    }
}
