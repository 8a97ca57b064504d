//! Database schema definitions
//!
//! This module contains all SQL schema definitions for the Lode-Finder database.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- One row per ingestion request
CREATE TABLE IF NOT EXISTS pipeline_runs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    input TEXT NOT NULL,
    entity_names TEXT NOT NULL,
    status TEXT NOT NULL,
    error_summary TEXT,
    created_at TEXT NOT NULL,
    completed_at TEXT
);

-- Progress of each entity within a run
CREATE TABLE IF NOT EXISTS pipeline_entity_status (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    run_id INTEGER NOT NULL REFERENCES pipeline_runs(id) ON DELETE CASCADE,
    entity_name TEXT NOT NULL,
    step TEXT NOT NULL,
    status TEXT NOT NULL,
    error_message TEXT,
    entity_id INTEGER REFERENCES entities(id) ON DELETE SET NULL,
    updated_at TEXT NOT NULL,
    UNIQUE(run_id, entity_name)
);

CREATE INDEX IF NOT EXISTS idx_entity_status_run ON pipeline_entity_status(run_id);

-- Companies, deduplicated on normalized name
CREATE TABLE IF NOT EXISTS entities (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    name_normalized TEXT NOT NULL UNIQUE,
    website_url TEXT,
    description TEXT,
    raw_source TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

-- List-valued columns hold JSON arrays of strings
CREATE TABLE IF NOT EXISTS leaders (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    entity_id INTEGER NOT NULL REFERENCES entities(id) ON DELETE CASCADE,
    name TEXT NOT NULL,
    title TEXT,
    expertise_tags TEXT NOT NULL DEFAULT '[]',
    summary_bullets TEXT NOT NULL DEFAULT '[]',
    source_url TEXT,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_leaders_entity ON leaders(entity_id);

CREATE TABLE IF NOT EXISTS assets (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    entity_id INTEGER NOT NULL REFERENCES entities(id) ON DELETE CASCADE,
    name TEXT NOT NULL,
    commodities TEXT NOT NULL DEFAULT '[]',
    status TEXT NOT NULL,
    country TEXT,
    state_province TEXT,
    town TEXT,
    latitude REAL,
    longitude REAL,
    source_url TEXT,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_assets_entity ON assets(entity_id);
"#;

/// Initializes the database schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
