//! Storage traits and error types
//!
//! This module defines the trait interface for storage backends and
//! associated error types.

use crate::state::{JobStatus, Progress};
use crate::storage::{ItemRecord, JobRecord, NewItem, NewJob};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Job not found: {0}")]
    JobNotFound(String),

    #[error("Invalid job transition: {from} -> {to}")]
    InvalidTransition { from: JobStatus, to: JobStatus },

    #[error("Corrupt row in {table}: {message}")]
    CorruptRow { table: &'static str, message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for storage backend implementations
///
/// Job lifecycle methods enforce [`JobStatus::can_transition_to`] and the
/// non-decreasing progress rule; callers do not need to check either.
pub trait Storage {
    // ===== Job Lifecycle =====

    /// Creates a pending job with progress 0
    fn create_job(&mut self, job: &NewJob) -> StorageResult<JobRecord>;

    /// Gets a job by ID
    fn get_job(&self, job_id: &str) -> StorageResult<JobRecord>;

    /// Moves a pending job to processing and stamps `started_at`
    fn start_job(&mut self, job_id: &str) -> StorageResult<()>;

    /// Records the source kind the dispatcher chose
    fn set_job_source_kind(&mut self, job_id: &str, kind: &str) -> StorageResult<()>;

    /// Raises the stored progress; lower values are ignored
    ///
    /// # Returns
    ///
    /// The progress value stored after the update
    fn update_job_progress(&mut self, job_id: &str, progress: Progress) -> StorageResult<Progress>;

    /// Marks a processing job completed with progress 100
    fn complete_job(&mut self, job_id: &str, items_extracted: u32) -> StorageResult<()>;

    /// Marks an active job failed with the given message
    fn fail_job(&mut self, job_id: &str, message: &str) -> StorageResult<()>;

    /// Lists jobs newest first, optionally for one team
    fn list_jobs(&self, team_id: Option<&str>, limit: usize) -> StorageResult<Vec<JobRecord>>;

    /// Finds the newest completed job for a team and URL key finished at or after `since`
    fn find_fresh_job(
        &self,
        team_id: &str,
        source_key: &str,
        since: DateTime<Utc>,
    ) -> StorageResult<Option<JobRecord>>;

    // ===== Knowledge Base Items =====

    /// Stores an item, computing its word count and content hash
    fn insert_item(&mut self, item: &NewItem) -> StorageResult<ItemRecord>;

    /// Stores a batch of items in one transaction; on error none are kept
    fn insert_items(&mut self, items: &[NewItem]) -> StorageResult<Vec<ItemRecord>>;

    /// Gets the items produced by a job in extraction order
    fn get_items_for_job(&self, job_id: &str) -> StorageResult<Vec<ItemRecord>>;

    /// Lists items newest first, optionally for one team
    fn list_items(&self, team_id: Option<&str>, limit: usize) -> StorageResult<Vec<ItemRecord>>;

    // ===== Statistics =====

    /// Counts jobs per status
    fn count_jobs_by_status(&self, team_id: Option<&str>) -> StorageResult<HashMap<JobStatus, u64>>;

    /// Counts stored items
    fn count_items(&self, team_id: Option<&str>) -> StorageResult<u64>;

    /// Sums word counts across items
    fn total_word_count(&self, team_id: Option<&str>) -> StorageResult<u64>;

    /// Counts items per content kind (`chapter`, `article`)
    fn count_items_by_kind(&self, team_id: Option<&str>) -> StorageResult<HashMap<String, u64>>;

    /// Counts items that went through the AI enhancer
    fn count_ai_enhanced(&self, team_id: Option<&str>) -> StorageResult<u64>;

    /// Counts items per topic, most frequent first
    fn topic_breakdown(&self, team_id: Option<&str>) -> StorageResult<Vec<(String, u64)>>;

    /// Mean processing time of completed jobs, in milliseconds
    fn average_job_duration_ms(&self, team_id: Option<&str>) -> StorageResult<Option<f64>>;
}
