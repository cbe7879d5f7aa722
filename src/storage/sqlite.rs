//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the Storage trait.

use crate::enhance::{Difficulty, EnhancementMethod};
use crate::extract::ContentKind;
use crate::state::{JobStatus, Progress};
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{Storage, StorageError, StorageResult};
use crate::storage::{
    content_hash, format_timestamp, ItemRecord, JobRecord, NewItem, NewJob, SourceType,
};
use crate::IngestError;
use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::HashMap;
use std::path::Path;
use uuid::Uuid;

const JOB_COLUMNS: &str = "id, team_id, source_type, source_ref, source_key, source_kind, status,
     progress, items_extracted, error_message, created_at, started_at, completed_at";

const ITEM_COLUMNS: &str = "id, job_id, team_id, position, title, content, author, source_ref,
     content_kind, word_count, read_time_minutes, difficulty, topics, summary, enhanced_by,
     content_hash, page_start, page_end, created_at";

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Creates a new SqliteStorage instance
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStorage)` - Successfully opened/created database
    /// * `Err(IngestError)` - Failed to open database
    pub fn new(path: &Path) -> Result<Self, IngestError> {
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

        Ok(Self { conn })
    }

    /// Creates an in-memory database
    pub fn new_in_memory() -> Result<Self, IngestError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }

    fn job_status(&self, job_id: &str) -> StorageResult<JobStatus> {
        let status: Option<String> = self
            .conn
            .query_row(
                "SELECT status FROM extraction_jobs WHERE id = ?1",
                params![job_id],
                |row| row.get(0),
            )
            .optional()?;

        let status = status.ok_or_else(|| StorageError::JobNotFound(job_id.to_string()))?;
        JobStatus::from_db_string(&status).ok_or_else(|| StorageError::CorruptRow {
            table: "extraction_jobs",
            message: format!("unknown status '{}'", status),
        })
    }

    /// Checks the lifecycle rule before a status change
    fn check_transition(&self, job_id: &str, to: JobStatus) -> StorageResult<()> {
        let from = self.job_status(job_id)?;
        if from.can_transition_to(to) {
            Ok(())
        } else {
            Err(StorageError::InvalidTransition { from, to })
        }
    }
}

fn invalid_column(index: usize, message: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(index, Type::Text, message.into())
}

fn job_from_row(row: &Row<'_>) -> rusqlite::Result<JobRecord> {
    let source_type: String = row.get(2)?;
    let status: String = row.get(6)?;

    Ok(JobRecord {
        id: row.get(0)?,
        team_id: row.get(1)?,
        source_type: SourceType::from_db_string(&source_type)
            .ok_or_else(|| invalid_column(2, format!("unknown source type '{}'", source_type)))?,
        source_ref: row.get(3)?,
        source_key: row.get(4)?,
        source_kind: row.get(5)?,
        status: JobStatus::from_db_string(&status)
            .ok_or_else(|| invalid_column(6, format!("unknown status '{}'", status)))?,
        progress: row.get(7)?,
        items_extracted: row.get(8)?,
        error_message: row.get(9)?,
        created_at: row.get(10)?,
        started_at: row.get(11)?,
        completed_at: row.get(12)?,
    })
}

fn item_from_row(row: &Row<'_>) -> rusqlite::Result<ItemRecord> {
    let content_kind: String = row.get(8)?;
    let difficulty: String = row.get(11)?;
    let topics: String = row.get(12)?;
    let enhanced_by: String = row.get(14)?;

    Ok(ItemRecord {
        id: row.get(0)?,
        job_id: row.get(1)?,
        team_id: row.get(2)?,
        position: row.get(3)?,
        title: row.get(4)?,
        content: row.get(5)?,
        author: row.get(6)?,
        source_ref: row.get(7)?,
        content_kind: ContentKind::from_db_string(&content_kind)
            .ok_or_else(|| invalid_column(8, format!("unknown content kind '{}'", content_kind)))?,
        word_count: row.get(9)?,
        read_time_minutes: row.get(10)?,
        difficulty: Difficulty::from_db_string(&difficulty)
            .ok_or_else(|| invalid_column(11, format!("unknown difficulty '{}'", difficulty)))?,
        topics: serde_json::from_str(&topics)
            .map_err(|e| invalid_column(12, format!("bad topics json: {}", e)))?,
        summary: row.get(13)?,
        enhanced_by: EnhancementMethod::from_db_string(&enhanced_by)
            .ok_or_else(|| invalid_column(14, format!("unknown method '{}'", enhanced_by)))?,
        content_hash: row.get(15)?,
        page_start: row.get(16)?,
        page_end: row.get(17)?,
        created_at: row.get(18)?,
    })
}

/// Inserts one item row and reads it back
fn insert_item_row(conn: &Connection, item: &NewItem) -> StorageResult<ItemRecord> {
    let id = Uuid::new_v4().to_string();
    let now = format_timestamp(Utc::now());
    let word_count = item.content.split_whitespace().count() as u32;
    let topics = serde_json::to_string(&item.topics)?;

    conn.execute(
        "INSERT INTO knowledge_base_items (id, job_id, team_id, position, title, content, author,
         source_ref, content_kind, word_count, read_time_minutes, difficulty, topics, summary,
         enhanced_by, content_hash, page_start, page_end, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19)",
        params![
            id,
            item.job_id,
            item.team_id,
            item.position,
            item.title,
            item.content,
            item.author,
            item.source_ref,
            item.content_kind.to_db_string(),
            word_count,
            item.read_time_minutes,
            item.difficulty.to_db_string(),
            topics,
            item.summary,
            item.enhanced_by.to_db_string(),
            content_hash(&item.content),
            item.page_start,
            item.page_end,
            now
        ],
    )?;

    let sql = format!("SELECT {} FROM knowledge_base_items WHERE id = ?1", ITEM_COLUMNS);
    Ok(conn.query_row(&sql, params![id], item_from_row)?)
}

impl Storage for SqliteStorage {
    // ===== Job Lifecycle =====

    fn create_job(&mut self, job: &NewJob) -> StorageResult<JobRecord> {
        let id = Uuid::new_v4().to_string();
        let now = format_timestamp(Utc::now());

        self.conn.execute(
            "INSERT INTO extraction_jobs (id, team_id, source_type, source_ref, source_key, status, progress, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0, ?7)",
            params![
                id,
                job.team_id,
                job.source_type.to_db_string(),
                job.source_ref,
                job.source_key,
                JobStatus::Pending.to_db_string(),
                now
            ],
        )?;

        self.get_job(&id)
    }

    fn get_job(&self, job_id: &str) -> StorageResult<JobRecord> {
        let sql = format!("SELECT {} FROM extraction_jobs WHERE id = ?1", JOB_COLUMNS);
        self.conn
            .query_row(&sql, params![job_id], job_from_row)
            .optional()?
            .ok_or_else(|| StorageError::JobNotFound(job_id.to_string()))
    }

    fn start_job(&mut self, job_id: &str) -> StorageResult<()> {
        self.check_transition(job_id, JobStatus::Processing)?;
        let now = format_timestamp(Utc::now());
        self.conn.execute(
            "UPDATE extraction_jobs SET status = ?1, started_at = ?2 WHERE id = ?3",
            params![JobStatus::Processing.to_db_string(), now, job_id],
        )?;
        Ok(())
    }

    fn set_job_source_kind(&mut self, job_id: &str, kind: &str) -> StorageResult<()> {
        let changed = self.conn.execute(
            "UPDATE extraction_jobs SET source_kind = ?1 WHERE id = ?2",
            params![kind, job_id],
        )?;
        if changed == 0 {
            return Err(StorageError::JobNotFound(job_id.to_string()));
        }
        Ok(())
    }

    fn update_job_progress(&mut self, job_id: &str, progress: Progress) -> StorageResult<Progress> {
        // Terminal jobs keep their final progress
        self.conn.execute(
            "UPDATE extraction_jobs SET progress = MAX(progress, ?1)
             WHERE id = ?2 AND status IN ('pending', 'processing')",
            params![progress.value(), job_id],
        )?;

        let stored: Option<u8> = self
            .conn
            .query_row(
                "SELECT progress FROM extraction_jobs WHERE id = ?1",
                params![job_id],
                |row| row.get(0),
            )
            .optional()?;

        stored
            .map(Progress::new)
            .ok_or_else(|| StorageError::JobNotFound(job_id.to_string()))
    }

    fn complete_job(&mut self, job_id: &str, items_extracted: u32) -> StorageResult<()> {
        self.check_transition(job_id, JobStatus::Completed)?;
        let now = format_timestamp(Utc::now());
        self.conn.execute(
            "UPDATE extraction_jobs SET status = ?1, progress = 100, items_extracted = ?2,
             completed_at = ?3, error_message = NULL WHERE id = ?4",
            params![
                JobStatus::Completed.to_db_string(),
                items_extracted,
                now,
                job_id
            ],
        )?;
        Ok(())
    }

    fn fail_job(&mut self, job_id: &str, message: &str) -> StorageResult<()> {
        self.check_transition(job_id, JobStatus::Failed)?;
        let now = format_timestamp(Utc::now());
        self.conn.execute(
            "UPDATE extraction_jobs SET status = ?1, error_message = ?2, completed_at = ?3
             WHERE id = ?4",
            params![JobStatus::Failed.to_db_string(), message, now, job_id],
        )?;
        Ok(())
    }

    fn list_jobs(&self, team_id: Option<&str>, limit: usize) -> StorageResult<Vec<JobRecord>> {
        let sql = format!(
            "SELECT {} FROM extraction_jobs WHERE (?1 IS NULL OR team_id = ?1)
             ORDER BY created_at DESC, rowid DESC LIMIT ?2",
            JOB_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let jobs = stmt
            .query_map(params![team_id, limit as i64], job_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(jobs)
    }

    fn find_fresh_job(
        &self,
        team_id: &str,
        source_key: &str,
        since: DateTime<Utc>,
    ) -> StorageResult<Option<JobRecord>> {
        let sql = format!(
            "SELECT {} FROM extraction_jobs
             WHERE team_id = ?1 AND source_key = ?2 AND status = ?3 AND completed_at >= ?4
             ORDER BY completed_at DESC LIMIT 1",
            JOB_COLUMNS
        );
        let job = self
            .conn
            .query_row(
                &sql,
                params![
                    team_id,
                    source_key,
                    JobStatus::Completed.to_db_string(),
                    format_timestamp(since)
                ],
                job_from_row,
            )
            .optional()?;
        Ok(job)
    }

    // ===== Knowledge Base Items =====

    fn insert_item(&mut self, item: &NewItem) -> StorageResult<ItemRecord> {
        insert_item_row(&self.conn, item)
    }

    fn insert_items(&mut self, items: &[NewItem]) -> StorageResult<Vec<ItemRecord>> {
        let tx = self.conn.transaction()?;
        let stored = items
            .iter()
            .map(|item| insert_item_row(&tx, item))
            .collect::<StorageResult<Vec<_>>>()?;
        tx.commit()?;
        Ok(stored)
    }

    fn get_items_for_job(&self, job_id: &str) -> StorageResult<Vec<ItemRecord>> {
        let sql = format!(
            "SELECT {} FROM knowledge_base_items WHERE job_id = ?1 ORDER BY position ASC",
            ITEM_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let items = stmt
            .query_map(params![job_id], item_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(items)
    }

    fn list_items(&self, team_id: Option<&str>, limit: usize) -> StorageResult<Vec<ItemRecord>> {
        let sql = format!(
            "SELECT {} FROM knowledge_base_items WHERE (?1 IS NULL OR team_id = ?1)
             ORDER BY created_at DESC, position ASC LIMIT ?2",
            ITEM_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let items = stmt
            .query_map(params![team_id, limit as i64], item_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(items)
    }

    // ===== Statistics =====

    fn count_jobs_by_status(&self, team_id: Option<&str>) -> StorageResult<HashMap<JobStatus, u64>> {
        let mut stmt = self.conn.prepare(
            "SELECT status, COUNT(*) FROM extraction_jobs WHERE (?1 IS NULL OR team_id = ?1)
             GROUP BY status",
        )?;

        let rows = stmt.query_map(params![team_id], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })?;

        let mut counts = HashMap::new();
        for row in rows {
            let (status, count) = row?;
            if let Some(status) = JobStatus::from_db_string(&status) {
                counts.insert(status, count as u64);
            }
        }

        Ok(counts)
    }

    fn count_items(&self, team_id: Option<&str>) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM knowledge_base_items WHERE (?1 IS NULL OR team_id = ?1)",
            params![team_id],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    fn total_word_count(&self, team_id: Option<&str>) -> StorageResult<u64> {
        let total: i64 = self.conn.query_row(
            "SELECT COALESCE(SUM(word_count), 0) FROM knowledge_base_items
             WHERE (?1 IS NULL OR team_id = ?1)",
            params![team_id],
            |row| row.get(0),
        )?;
        Ok(total as u64)
    }

    fn count_items_by_kind(&self, team_id: Option<&str>) -> StorageResult<HashMap<String, u64>> {
        let mut stmt = self.conn.prepare(
            "SELECT content_kind, COUNT(*) FROM knowledge_base_items
             WHERE (?1 IS NULL OR team_id = ?1) GROUP BY content_kind",
        )?;

        let counts = stmt
            .query_map(params![team_id], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)? as u64))
            })?
            .collect::<Result<HashMap<_, _>, _>>()?;

        Ok(counts)
    }

    fn count_ai_enhanced(&self, team_id: Option<&str>) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM knowledge_base_items
             WHERE (?1 IS NULL OR team_id = ?1) AND enhanced_by = ?2",
            params![team_id, EnhancementMethod::Ai.to_db_string()],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    fn topic_breakdown(&self, team_id: Option<&str>) -> StorageResult<Vec<(String, u64)>> {
        let mut stmt = self.conn.prepare(
            "SELECT topics FROM knowledge_base_items WHERE (?1 IS NULL OR team_id = ?1)",
        )?;
        let rows = stmt.query_map(params![team_id], |row| row.get::<_, String>(0))?;

        let mut counts: HashMap<String, u64> = HashMap::new();
        for row in rows {
            let topics: Vec<String> = serde_json::from_str(&row?)?;
            for topic in topics {
                *counts.entry(topic).or_insert(0) += 1;
            }
        }

        let mut breakdown: Vec<(String, u64)> = counts.into_iter().collect();
        breakdown.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        Ok(breakdown)
    }

    fn average_job_duration_ms(&self, team_id: Option<&str>) -> StorageResult<Option<f64>> {
        let average: Option<f64> = self.conn.query_row(
            "SELECT AVG((julianday(completed_at) - julianday(started_at)) * 86400000.0)
             FROM extraction_jobs
             WHERE (?1 IS NULL OR team_id = ?1) AND status = ?2 AND started_at IS NOT NULL",
            params![team_id, JobStatus::Completed.to_db_string()],
            |row| row.get(0),
        )?;
        Ok(average)
    }
}
