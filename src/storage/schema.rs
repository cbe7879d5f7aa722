//! Database schema definitions
//!
//! This module contains all SQL schema definitions for the kb-ingest database.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- One row per ingestion request
CREATE TABLE IF NOT EXISTS extraction_jobs (
    id TEXT PRIMARY KEY,
    team_id TEXT NOT NULL,
    source_type TEXT NOT NULL,
    source_ref TEXT NOT NULL,
    source_key TEXT,
    source_kind TEXT,
    status TEXT NOT NULL,
    progress INTEGER NOT NULL DEFAULT 0 CHECK (progress BETWEEN 0 AND 100),
    items_extracted INTEGER NOT NULL DEFAULT 0,
    error_message TEXT,
    created_at TEXT NOT NULL,
    started_at TEXT,
    completed_at TEXT
);

CREATE INDEX IF NOT EXISTS idx_jobs_team ON extraction_jobs(team_id, created_at);
CREATE INDEX IF NOT EXISTS idx_jobs_status ON extraction_jobs(status);
CREATE INDEX IF NOT EXISTS idx_jobs_freshness ON extraction_jobs(team_id, source_key, completed_at);

-- One row per extracted chapter or article
CREATE TABLE IF NOT EXISTS knowledge_base_items (
    id TEXT PRIMARY KEY,
    job_id TEXT NOT NULL REFERENCES extraction_jobs(id),
    team_id TEXT NOT NULL,
    position INTEGER NOT NULL,
    title TEXT NOT NULL,
    content TEXT NOT NULL,
    author TEXT,
    source_ref TEXT NOT NULL,
    content_kind TEXT NOT NULL,
    word_count INTEGER NOT NULL,
    read_time_minutes INTEGER NOT NULL,
    difficulty TEXT NOT NULL,
    topics TEXT NOT NULL,
    summary TEXT NOT NULL,
    enhanced_by TEXT NOT NULL,
    content_hash TEXT NOT NULL,
    page_start INTEGER,
    page_end INTEGER,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_items_job ON knowledge_base_items(job_id, position);
CREATE INDEX IF NOT EXISTS idx_items_team ON knowledge_base_items(team_id, created_at);
CREATE INDEX IF NOT EXISTS idx_items_hash ON knowledge_base_items(content_hash);
"#;

/// Initializes the database schema
///
/// # Arguments
///
/// * `conn` - The database connection
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
