//! Storage traits and error types
//!
//! This module defines the trait interface for storage backends and
//! associated error types.

use crate::model::{AssetRecord, EntityState, LeaderRecord, PipelineStep, RunStatus};
use crate::storage::{EntityDetail, EntityRecord, EntitySummary, RunDetail};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Run not found: {0}")]
    RunNotFound(i64),

    #[error("Entity not found: {0}")]
    EntityNotFound(i64),

    #[error("No status row for '{entity_name}' in run {run_id}")]
    EntityStatusNotFound { run_id: i64, entity_name: String },

    #[error("Invalid step transition: {from} -> {to}")]
    InvalidTransition { from: PipelineStep, to: PipelineStep },

    #[error("Run {run_id} already finished with status {status}")]
    RunFinalized { run_id: i64, status: RunStatus },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for storage backend implementations
///
/// Every method takes `&self` so one backend can be shared across entity
/// tasks behind an `Arc`; implementations synchronize internally.
pub trait Storage: Send + Sync {
    // ===== Run Management =====

    /// Creates a run in `processing` state with a `pending` status row per entity
    ///
    /// # Returns
    ///
    /// The ID of the newly created run
    fn create_run(&self, input: &str, entity_names: &[String]) -> StorageResult<i64>;

    /// Sets a run's status and error summary
    ///
    /// A terminal status also stamps the completion time. Once a run is
    /// terminal its status can no longer change and this returns
    /// `StorageError::RunFinalized`.
    fn update_run_status(
        &self,
        run_id: i64,
        status: RunStatus,
        error_summary: Option<&str>,
    ) -> StorageResult<()>;

    /// Gets a run together with its entity status rows, in input order
    fn get_run(&self, run_id: i64) -> StorageResult<RunDetail>;

    // ===== Entity Progress =====

    /// Moves an entity to `step` with the given status
    ///
    /// Steps only move forward; a backwards move or a move out of a terminal
    /// step returns `StorageError::InvalidTransition`. `entity_id` is kept
    /// when passed as `None`.
    fn update_entity_status(
        &self,
        run_id: i64,
        entity_name: &str,
        step: PipelineStep,
        status: EntityState,
        error_message: Option<&str>,
        entity_id: Option<i64>,
    ) -> StorageResult<()>;

    // ===== Entities =====

    /// Inserts or updates an entity keyed on its normalized name
    ///
    /// `None` fields keep whatever the stored entity already has.
    fn upsert_entity(
        &self,
        name: &str,
        website_url: Option<&str>,
        description: Option<&str>,
        raw_source: Option<&str>,
    ) -> StorageResult<EntityRecord>;

    /// Replaces an entity's leaders with `leaders`
    ///
    /// An empty slice leaves the existing leaders in place.
    fn replace_leaders(
        &self,
        entity_id: i64,
        leaders: &[LeaderRecord],
        source_url: Option<&str>,
    ) -> StorageResult<()>;

    /// Replaces an entity's assets with `assets`
    ///
    /// An empty slice leaves the existing assets in place.
    fn replace_assets(
        &self,
        entity_id: i64,
        assets: &[AssetRecord],
        source_url: Option<&str>,
    ) -> StorageResult<()>;

    /// Gets an entity with all of its leaders and assets
    fn get_entity(&self, entity_id: i64) -> StorageResult<EntityDetail>;

    /// Lists every entity with child counts, ordered by name
    fn list_entities(&self) -> StorageResult<Vec<EntitySummary>>;
}
