//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the Storage trait.
//! A single connection sits behind a mutex; every statement is short, so
//! entity tasks simply take turns.

use crate::model::{
    normalize_name, AssetRecord, AssetStatus, EntityState, LeaderRecord, PipelineStep, RunStatus,
};
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{Storage, StorageError, StorageResult};
use crate::storage::{
    EntityDetail, EntityRecord, EntityStatusRecord, EntitySummary, PipelineRun, RunDetail,
    StoredAsset, StoredLeader,
};
use chrono::Utc;
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Mutex<Connection>,
}

impl SqliteStorage {
    /// Opens or creates the database at `path`
    pub fn new(path: &Path) -> StorageResult<Self> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Creates an in-memory database
    pub fn open_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> StorageResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| StorageError::Database("connection mutex poisoned".to_string()))
    }
}

fn now() -> String {
    Utc::now().to_rfc3339()
}

/// Reads a JSON array-of-strings column
fn json_list(row: &Row<'_>, index: usize) -> rusqlite::Result<Vec<String>> {
    let text: String = row.get(index)?;
    serde_json::from_str(&text)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(index, Type::Text, Box::new(e)))
}

fn run_from_row(row: &Row<'_>) -> rusqlite::Result<PipelineRun> {
    Ok(PipelineRun {
        id: row.get(0)?,
        input: row.get(1)?,
        entity_names: json_list(row, 2)?,
        status: RunStatus::from_db_string(&row.get::<_, String>(3)?)
            .unwrap_or(RunStatus::Processing),
        error_summary: row.get(4)?,
        created_at: row.get(5)?,
        completed_at: row.get(6)?,
    })
}

fn entity_from_row(row: &Row<'_>) -> rusqlite::Result<EntityRecord> {
    Ok(EntityRecord {
        id: row.get(0)?,
        name: row.get(1)?,
        name_normalized: row.get(2)?,
        website_url: row.get(3)?,
        description: row.get(4)?,
        raw_source: row.get(5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}

const ENTITY_COLUMNS: &str =
    "id, name, name_normalized, website_url, description, raw_source, created_at, updated_at";

impl Storage for SqliteStorage {
    // ===== Run Management =====

    fn create_run(&self, input: &str, entity_names: &[String]) -> StorageResult<i64> {
        let mut conn = self.conn()?;
        let now = now();
        let names_json = serde_json::to_string(entity_names)?;

        let tx = conn.transaction()?;
        tx.execute(
            "INSERT INTO pipeline_runs (input, entity_names, status, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![input, names_json, RunStatus::Processing.to_db_string(), now],
        )?;
        let run_id = tx.last_insert_rowid();

        for name in entity_names {
            tx.execute(
                "INSERT INTO pipeline_entity_status (run_id, entity_name, step, status, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    run_id,
                    name,
                    PipelineStep::Pending.to_db_string(),
                    EntityState::Pending.to_db_string(),
                    now
                ],
            )?;
        }
        tx.commit()?;

        Ok(run_id)
    }

    fn update_run_status(
        &self,
        run_id: i64,
        status: RunStatus,
        error_summary: Option<&str>,
    ) -> StorageResult<()> {
        let conn = self.conn()?;
        let completed_at = status.is_terminal().then(now);

        let updated = conn.execute(
            "UPDATE pipeline_runs SET status = ?1, error_summary = ?2, completed_at = ?3
             WHERE id = ?4 AND status = ?5",
            params![
                status.to_db_string(),
                error_summary,
                completed_at,
                run_id,
                RunStatus::Processing.to_db_string()
            ],
        )?;

        if updated == 0 {
            let current: Option<String> = conn
                .query_row(
                    "SELECT status FROM pipeline_runs WHERE id = ?1",
                    params![run_id],
                    |row| row.get(0),
                )
                .optional()?;

            return match current {
                None => Err(StorageError::RunNotFound(run_id)),
                Some(current) => Err(StorageError::RunFinalized {
                    run_id,
                    status: RunStatus::from_db_string(&current).unwrap_or(RunStatus::Failed),
                }),
            };
        }

        Ok(())
    }

    fn get_run(&self, run_id: i64) -> StorageResult<RunDetail> {
        let conn = self.conn()?;

        let run = conn
            .query_row(
                "SELECT id, input, entity_names, status, error_summary, created_at, completed_at
                 FROM pipeline_runs WHERE id = ?1",
                params![run_id],
                run_from_row,
            )
            .optional()?
            .ok_or(StorageError::RunNotFound(run_id))?;

        let mut stmt = conn.prepare(
            "SELECT run_id, entity_name, step, status, error_message, entity_id, updated_at
             FROM pipeline_entity_status WHERE run_id = ?1 ORDER BY id",
        )?;
        let entities = stmt
            .query_map(params![run_id], |row| {
                Ok(EntityStatusRecord {
                    run_id: row.get(0)?,
                    entity_name: row.get(1)?,
                    step: PipelineStep::from_db_string(&row.get::<_, String>(2)?)
                        .unwrap_or(PipelineStep::Pending),
                    status: EntityState::from_db_string(&row.get::<_, String>(3)?)
                        .unwrap_or(EntityState::Pending),
                    error_message: row.get(4)?,
                    entity_id: row.get(5)?,
                    updated_at: row.get(6)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(RunDetail { run, entities })
    }

    // ===== Entity Progress =====

    fn update_entity_status(
        &self,
        run_id: i64,
        entity_name: &str,
        step: PipelineStep,
        status: EntityState,
        error_message: Option<&str>,
        entity_id: Option<i64>,
    ) -> StorageResult<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        let current: String = tx
            .query_row(
                "SELECT step FROM pipeline_entity_status WHERE run_id = ?1 AND entity_name = ?2",
                params![run_id, entity_name],
                |row| row.get(0),
            )
            .optional()?
            .ok_or_else(|| StorageError::EntityStatusNotFound {
                run_id,
                entity_name: entity_name.to_string(),
            })?;

        let current = PipelineStep::from_db_string(&current).unwrap_or(PipelineStep::Pending);
        if !current.can_advance_to(step) {
            return Err(StorageError::InvalidTransition {
                from: current,
                to: step,
            });
        }

        tx.execute(
            "UPDATE pipeline_entity_status
             SET step = ?1, status = ?2, error_message = ?3,
                 entity_id = COALESCE(?4, entity_id), updated_at = ?5
             WHERE run_id = ?6 AND entity_name = ?7",
            params![
                step.to_db_string(),
                status.to_db_string(),
                error_message,
                entity_id,
                now(),
                run_id,
                entity_name
            ],
        )?;
        tx.commit()?;

        Ok(())
    }

    // ===== Entities =====

    fn upsert_entity(
        &self,
        name: &str,
        website_url: Option<&str>,
        description: Option<&str>,
        raw_source: Option<&str>,
    ) -> StorageResult<EntityRecord> {
        let conn = self.conn()?;
        let normalized = normalize_name(name);
        let now = now();

        conn.execute(
            "INSERT INTO entities
                (name, name_normalized, website_url, description, raw_source, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)
             ON CONFLICT(name_normalized) DO UPDATE SET
                name = excluded.name,
                website_url = COALESCE(excluded.website_url, entities.website_url),
                description = COALESCE(excluded.description, entities.description),
                raw_source = COALESCE(excluded.raw_source, entities.raw_source),
                updated_at = excluded.updated_at",
            params![name.trim(), normalized, website_url, description, raw_source, now],
        )?;

        let entity = conn.query_row(
            &format!(
                "SELECT {} FROM entities WHERE name_normalized = ?1",
                ENTITY_COLUMNS
            ),
            params![normalized],
            entity_from_row,
        )?;

        Ok(entity)
    }

    fn replace_leaders(
        &self,
        entity_id: i64,
        leaders: &[LeaderRecord],
        source_url: Option<&str>,
    ) -> StorageResult<()> {
        if leaders.is_empty() {
            return Ok(());
        }

        let mut conn = self.conn()?;
        let now = now();
        let tx = conn.transaction()?;

        tx.execute("DELETE FROM leaders WHERE entity_id = ?1", params![entity_id])?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO leaders
                    (entity_id, name, title, expertise_tags, summary_bullets, source_url, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            )?;
            for leader in leaders {
                stmt.execute(params![
                    entity_id,
                    leader.name,
                    leader.title,
                    serde_json::to_string(&leader.expertise_tags)?,
                    serde_json::to_string(&leader.summary_bullets)?,
                    source_url,
                    now
                ])?;
            }
        }
        tx.commit()?;

        Ok(())
    }

    fn replace_assets(
        &self,
        entity_id: i64,
        assets: &[AssetRecord],
        source_url: Option<&str>,
    ) -> StorageResult<()> {
        if assets.is_empty() {
            return Ok(());
        }

        let mut conn = self.conn()?;
        let now = now();
        let tx = conn.transaction()?;

        tx.execute("DELETE FROM assets WHERE entity_id = ?1", params![entity_id])?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO assets
                    (entity_id, name, commodities, status, country, state_province, town,
                     latitude, longitude, source_url, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            )?;
            for asset in assets {
                stmt.execute(params![
                    entity_id,
                    asset.name,
                    serde_json::to_string(&asset.commodities)?,
                    asset.status.to_db_string(),
                    asset.country,
                    asset.state_province,
                    asset.town,
                    asset.latitude,
                    asset.longitude,
                    source_url,
                    now
                ])?;
            }
        }
        tx.commit()?;

        Ok(())
    }

    fn get_entity(&self, entity_id: i64) -> StorageResult<EntityDetail> {
        let conn = self.conn()?;

        let entity = conn
            .query_row(
                &format!("SELECT {} FROM entities WHERE id = ?1", ENTITY_COLUMNS),
                params![entity_id],
                entity_from_row,
            )
            .optional()?
            .ok_or(StorageError::EntityNotFound(entity_id))?;

        let mut stmt = conn.prepare(
            "SELECT name, title, expertise_tags, summary_bullets, source_url
             FROM leaders WHERE entity_id = ?1 ORDER BY id",
        )?;
        let leaders = stmt
            .query_map(params![entity_id], |row| {
                Ok(StoredLeader {
                    leader: LeaderRecord {
                        name: row.get(0)?,
                        title: row.get(1)?,
                        expertise_tags: json_list(row, 2)?,
                        summary_bullets: json_list(row, 3)?,
                    },
                    source_url: row.get(4)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut stmt = conn.prepare(
            "SELECT name, commodities, status, country, state_province, town,
                    latitude, longitude, source_url
             FROM assets WHERE entity_id = ?1 ORDER BY id",
        )?;
        let assets = stmt
            .query_map(params![entity_id], |row| {
                Ok(StoredAsset {
                    asset: AssetRecord {
                        name: row.get(0)?,
                        commodities: json_list(row, 1)?,
                        status: AssetStatus::from_db_string(&row.get::<_, String>(2)?)
                            .unwrap_or(AssetStatus::Unknown),
                        country: row.get(3)?,
                        state_province: row.get(4)?,
                        town: row.get(5)?,
                        latitude: row.get(6)?,
                        longitude: row.get(7)?,
                    },
                    source_url: row.get(8)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(EntityDetail {
            entity,
            leaders,
            assets,
        })
    }

    fn list_entities(&self) -> StorageResult<Vec<EntitySummary>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT e.id, e.name, e.website_url, e.updated_at,
                    (SELECT COUNT(*) FROM leaders l WHERE l.entity_id = e.id),
                    (SELECT COUNT(*) FROM assets a WHERE a.entity_id = e.id)
             FROM entities e ORDER BY e.name_normalized",
        )?;

        let entities = stmt
            .query_map([], |row| {
                Ok(EntitySummary {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    website_url: row.get(2)?,
                    updated_at: row.get(3)?,
                    leader_count: row.get::<_, i64>(4)? as u64,
                    asset_count: row.get::<_, i64>(5)? as u64,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(entities)
    }
}
