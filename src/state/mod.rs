//! State module for tracking extraction jobs
//!
//! # Components
//!
//! - `JobStatus`: lifecycle of an extraction job (pending, processing, completed, failed)
//! - `Progress`: monotonically increasing 0-100 progress value

mod job_state;
mod progress;

// Re-export main types
pub use job_state::JobStatus;
pub use progress::Progress;
