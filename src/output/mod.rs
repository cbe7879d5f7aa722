//! Output module for statistics and exports
//!
//! This module handles:
//! - Aggregating dashboard statistics from storage
//! - Printing statistics for the CLI
//! - Exporting the knowledge base as markdown

mod markdown;
pub mod stats;

pub use markdown::{export_markdown, format_markdown_export};
pub use stats::{load_statistics, print_statistics, DashboardStats, TopicCount};
