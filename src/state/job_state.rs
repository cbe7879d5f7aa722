/// Extraction job status definitions
///
/// A job moves `Pending → Processing → Completed | Failed`. A pending job may
/// also fail directly (e.g. the upload could not be read before work began).
use serde::{Deserialize, Serialize};
use std::fmt;

/// Represents the lifecycle state of an extraction job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    /// Job row exists but work has not started
    Pending,

    /// Extraction is running; progress is being reported
    Processing,

    /// All items were extracted and stored
    Completed,

    /// The job stopped with an error message
    Failed,
}

impl JobStatus {
    /// Returns true if no further transitions are allowed
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Returns true if the job is still pending or processing
    pub fn is_active(&self) -> bool {
        !self.is_terminal()
    }

    /// Checks whether moving to `next` is a legal lifecycle transition
    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Processing)
                | (Self::Pending, Self::Failed)
                | (Self::Processing, Self::Completed)
                | (Self::Processing, Self::Failed)
        )
    }

    /// Converts the status to its database string representation
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    /// Parses a status from its database string representation
    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "processing" => Some(Self::Processing),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }

    /// Returns all job statuses in lifecycle order
    pub fn all() -> [Self; 4] {
        [Self::Pending, Self::Processing, Self::Completed, Self::Failed]
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_string())
    }
}
