//! Progress events sent to the client while a job runs

use crate::pipeline::PipelineOutcome;
use crate::state::Progress;
use crate::storage::ItemRecord;
use serde::Serialize;
use tokio::sync::mpsc::Sender;

/// An event on the progress stream
///
/// Serialized with a `type` tag: `progress`, `complete` or `error`.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ProgressEvent {
    Progress {
        #[serde(skip_serializing_if = "Option::is_none")]
        job_id: Option<String>,
        progress: u8,
        message: String,
    },
    Complete {
        job_id: String,
        items: Vec<ItemRecord>,
        cached: bool,
    },
    Error {
        #[serde(skip_serializing_if = "Option::is_none")]
        job_id: Option<String>,
        message: String,
    },
}

impl ProgressEvent {
    /// The SSE event name, equal to the `type` tag
    pub fn event_name(&self) -> &'static str {
        match self {
            Self::Progress { .. } => "progress",
            Self::Complete { .. } => "complete",
            Self::Error { .. } => "error",
        }
    }

    /// Returns true for `complete` and `error`
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Progress { .. })
    }
}

/// Sends progress events for one run
///
/// Progress values only move forward. Once the receiver is gone, events are
/// dropped silently and the run carries on.
pub struct ProgressReporter {
    events: Sender<ProgressEvent>,
    progress: Progress,
    finished: bool,
}

impl ProgressReporter {
    pub fn new(events: Sender<ProgressEvent>) -> Self {
        Self {
            events,
            progress: Progress::default(),
            finished: false,
        }
    }

    /// Emits a progress event unless `value` would move progress backwards
    pub async fn report(&mut self, job_id: Option<&str>, value: u8, message: impl Into<String>) {
        if self.finished || value < self.progress.value() {
            return;
        }
        self.progress.advance(value);

        self.send(ProgressEvent::Progress {
            job_id: job_id.map(str::to_string),
            progress: self.progress.value(),
            message: message.into(),
        })
        .await;
    }

    /// Emits the terminal event for `outcome`; later calls do nothing
    pub async fn finish(&mut self, outcome: &PipelineOutcome) {
        if self.finished {
            return;
        }
        self.finished = true;
        self.send(outcome.to_event()).await;
    }

    async fn send(&self, event: ProgressEvent) {
        if self.events.send(event).await.is_err() {
            tracing::debug!("Progress receiver closed, dropping event");
        }
    }
}
