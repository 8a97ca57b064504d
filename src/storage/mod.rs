//! Storage module for persisting runs and extracted company data
//!
//! This module handles all database operations for the pipeline, including:
//! - SQLite database initialization and schema management
//! - Run and per-entity progress tracking
//! - Entity upserts keyed on normalized name
//! - Leader and asset replacement

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStorage;
pub use traits::{Storage, StorageError, StorageResult};

use crate::model::{AssetRecord, EntityState, LeaderRecord, PipelineStep, RunStatus};
use serde::Serialize;
use std::path::Path;

/// Initializes or opens a storage database
pub fn open_storage(path: &Path) -> StorageResult<SqliteStorage> {
    SqliteStorage::new(path)
}

/// One ingestion request and its aggregate outcome
#[derive(Debug, Clone, Serialize)]
pub struct PipelineRun {
    pub id: i64,
    pub input: String,
    pub entity_names: Vec<String>,
    pub status: RunStatus,
    pub error_summary: Option<String>,
    pub created_at: String,
    pub completed_at: Option<String>,
}

/// Progress of one entity within a run
#[derive(Debug, Clone, Serialize)]
pub struct EntityStatusRecord {
    pub run_id: i64,
    pub entity_name: String,
    pub step: PipelineStep,
    pub status: EntityState,
    pub error_message: Option<String>,
    pub entity_id: Option<i64>,
    pub updated_at: String,
}

/// A run with its entity status rows
#[derive(Debug, Clone, Serialize)]
pub struct RunDetail {
    pub run: PipelineRun,
    pub entities: Vec<EntityStatusRecord>,
}

/// A persisted company
#[derive(Debug, Clone, Serialize)]
pub struct EntityRecord {
    pub id: i64,
    pub name: String,
    pub name_normalized: String,
    pub website_url: Option<String>,
    pub description: Option<String>,
    pub raw_source: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct StoredLeader {
    #[serde(flatten)]
    pub leader: LeaderRecord,
    pub source_url: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StoredAsset {
    #[serde(flatten)]
    pub asset: AssetRecord,
    pub source_url: Option<String>,
}

/// An entity with its children
#[derive(Debug, Clone, Serialize)]
pub struct EntityDetail {
    pub entity: EntityRecord,
    pub leaders: Vec<StoredLeader>,
    pub assets: Vec<StoredAsset>,
}

/// Listing row for an entity
#[derive(Debug, Clone, Serialize)]
pub struct EntitySummary {
    pub id: i64,
    pub name: String,
    pub website_url: Option<String>,
    pub leader_count: u64,
    pub asset_count: u64,
    pub updated_at: String,
}
