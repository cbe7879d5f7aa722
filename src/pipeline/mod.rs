//! Extraction pipeline module
//!
//! This module runs one ingestion request end to end:
//! - URL requests: normalize, freshness check, dispatch, extract, enhance, persist
//! - PDF uploads: read pages, detect chapters, enhance, persist
//! - Progress reporting over a channel, ending in exactly one terminal event

mod events;
mod runner;

pub use events::{ProgressEvent, ProgressReporter};
pub use runner::Pipeline;

use crate::storage::ItemRecord;
use serde::{Deserialize, Serialize};

/// A request to ingest a URL
#[derive(Debug, Clone, Deserialize)]
pub struct UrlRequest {
    pub url: String,
    pub team_id: String,
}

/// A request to ingest an uploaded PDF
#[derive(Debug, Clone)]
pub struct PdfRequest {
    pub team_id: String,
    pub filename: String,
    pub bytes: Vec<u8>,
}

/// Final result of a pipeline run
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum PipelineOutcome {
    Completed {
        job_id: String,
        items: Vec<ItemRecord>,
        /// True when a fresh earlier job was reused instead of extracting
        cached: bool,
    },
    Failed {
        /// Absent when the request failed before a job was created
        job_id: Option<String>,
        message: String,
    },
}

impl PipelineOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Completed { .. })
    }

    pub fn job_id(&self) -> Option<&str> {
        match self {
            Self::Completed { job_id, .. } => Some(job_id),
            Self::Failed { job_id, .. } => job_id.as_deref(),
        }
    }

    /// The event that ends a run with this outcome
    pub fn to_event(&self) -> ProgressEvent {
        match self {
            Self::Completed {
                job_id,
                items,
                cached,
            } => ProgressEvent::Complete {
                job_id: job_id.clone(),
                items: items.clone(),
                cached: *cached,
            },
            Self::Failed { job_id, message } => ProgressEvent::Error {
                job_id: job_id.clone(),
                message: message.clone(),
            },
        }
    }
}
