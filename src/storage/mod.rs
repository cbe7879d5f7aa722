//! Storage module for persisting extraction jobs and knowledge base items
//!
//! This module handles all database operations for the service, including:
//! - SQLite database initialization and schema management
//! - Extraction job lifecycle rows (status, progress, timing)
//! - Knowledge base item rows
//! - Freshness lookups and dashboard aggregates

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStorage;
pub use traits::{Storage, StorageError, StorageResult};

use crate::enhance::{Difficulty, EnhancementMethod};
use crate::extract::ContentKind;
use crate::state::JobStatus;
use crate::IngestError;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::Path;

/// Initializes or opens a storage database
///
/// # Arguments
///
/// * `path` - Path to the SQLite database file
///
/// # Returns
///
/// * `Ok(SqliteStorage)` - Successfully initialized storage
/// * `Err(IngestError)` - Failed to initialize storage
pub fn open_storage(path: &Path) -> Result<SqliteStorage, IngestError> {
    SqliteStorage::new(path)
}

/// Formats a timestamp the way every row stores it
///
/// Fixed-width millisecond RFC 3339 in UTC, so string comparison in SQL
/// orders the same as time.
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Hex SHA-256 of an item body
pub fn content_hash(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    hex::encode(hasher.finalize())
}

/// Where a job's input came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    Url,
    Pdf,
}

impl SourceType {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Url => "url",
            Self::Pdf => "pdf",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "url" => Some(Self::Url),
            "pdf" => Some(Self::Pdf),
            _ => None,
        }
    }
}

/// Fields needed to create an extraction job
#[derive(Debug, Clone)]
pub struct NewJob {
    pub team_id: String,
    pub source_type: SourceType,
    /// Normalized URL, or `pdf:<filename>` for uploads
    pub source_ref: String,
    /// Freshness key for URL jobs
    pub source_key: Option<String>,
}

/// Represents an extraction job row
#[derive(Debug, Clone, Serialize)]
pub struct JobRecord {
    pub id: String,
    pub team_id: String,
    pub source_type: SourceType,
    pub source_ref: String,
    pub source_key: Option<String>,
    pub source_kind: Option<String>,
    pub status: JobStatus,
    pub progress: u8,
    pub items_extracted: u32,
    pub error_message: Option<String>,
    pub created_at: String,
    pub started_at: Option<String>,
    pub completed_at: Option<String>,
}

impl JobRecord {
    /// Wall-clock processing time, once the job has finished
    pub fn duration_ms(&self) -> Option<i64> {
        let started = self.started_at.as_ref()?.parse::<DateTime<Utc>>().ok()?;
        let finished = self.completed_at.as_ref()?.parse::<DateTime<Utc>>().ok()?;
        Some((finished - started).num_milliseconds())
    }
}

/// Fields needed to store a knowledge base item
#[derive(Debug, Clone)]
pub struct NewItem {
    pub job_id: String,
    pub team_id: String,
    pub position: u32,
    pub title: String,
    pub content: String,
    pub author: Option<String>,
    pub source_ref: String,
    pub content_kind: ContentKind,
    pub summary: String,
    pub topics: Vec<String>,
    pub read_time_minutes: u32,
    pub difficulty: Difficulty,
    pub enhanced_by: EnhancementMethod,
    pub page_start: Option<u32>,
    pub page_end: Option<u32>,
}

/// Represents a knowledge base item row
#[derive(Debug, Clone, Serialize)]
pub struct ItemRecord {
    pub id: String,
    pub job_id: String,
    pub team_id: String,
    pub position: u32,
    pub title: String,
    pub content: String,
    pub author: Option<String>,
    pub source_ref: String,
    pub content_kind: ContentKind,
    pub word_count: u32,
    pub read_time_minutes: u32,
    pub difficulty: Difficulty,
    pub topics: Vec<String>,
    pub summary: String,
    pub enhanced_by: EnhancementMethod,
    pub content_hash: String,
    pub page_start: Option<u32>,
    pub page_end: Option<u32>,
    pub created_at: String,
}
