//! Dashboard statistics
//!
//! This module aggregates job and item counts from the storage layer for
//! the dashboard endpoint and the CLI.

use crate::state::JobStatus;
use crate::storage::Storage;
use crate::IngestError;
use serde::Serialize;
use std::collections::BTreeMap;

/// Topics listed in the dashboard breakdown
const TOP_TOPICS: usize = 10;

/// Item count for one topic
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TopicCount {
    pub topic: String,
    pub count: u64,
}

/// Dashboard statistics summary
#[derive(Debug, Clone, Serialize)]
pub struct DashboardStats {
    /// Team the numbers are scoped to, or all teams when absent
    pub team_id: Option<String>,

    pub total_jobs: u64,

    /// Count of jobs by status name
    pub jobs_by_status: BTreeMap<String, u64>,

    /// Completed jobs as a percentage of finished jobs
    pub success_rate: f64,

    pub total_items: u64,
    pub total_words: u64,

    /// Count of items by content kind
    pub items_by_kind: BTreeMap<String, u64>,

    /// Items whose metadata came from the text-generation API
    pub ai_enhanced_items: u64,

    /// Most common topics, best first
    pub top_topics: Vec<TopicCount>,

    /// Mean processing time of completed jobs
    pub average_job_duration_ms: Option<f64>,
}

impl DashboardStats {
    /// Jobs in the given status
    pub fn jobs_with_status(&self, status: JobStatus) -> u64 {
        self.jobs_by_status
            .get(status.to_db_string())
            .copied()
            .unwrap_or(0)
    }
}

/// Loads statistics from storage
///
/// # Arguments
///
/// * `storage` - The storage backend to query
/// * `team_id` - Restrict to one team, or `None` for every team
///
/// # Returns
///
/// * `Ok(DashboardStats)` - Successfully loaded statistics
/// * `Err(IngestError)` - Failed to query statistics
pub fn load_statistics(
    storage: &dyn Storage,
    team_id: Option<&str>,
) -> Result<DashboardStats, IngestError> {
    let by_status = storage.count_jobs_by_status(team_id)?;

    let mut jobs_by_status = BTreeMap::new();
    for status in JobStatus::all() {
        jobs_by_status.insert(
            status.to_db_string().to_string(),
            by_status.get(&status).copied().unwrap_or(0),
        );
    }
    let total_jobs = jobs_by_status.values().sum();

    let completed = by_status.get(&JobStatus::Completed).copied().unwrap_or(0);
    let failed = by_status.get(&JobStatus::Failed).copied().unwrap_or(0);
    let success_rate = if completed + failed > 0 {
        completed as f64 / (completed + failed) as f64 * 100.0
    } else {
        0.0
    };

    let top_topics = storage
        .topic_breakdown(team_id)?
        .into_iter()
        .take(TOP_TOPICS)
        .map(|(topic, count)| TopicCount { topic, count })
        .collect();

    Ok(DashboardStats {
        team_id: team_id.map(str::to_string),
        total_jobs,
        jobs_by_status,
        success_rate,
        total_items: storage.count_items(team_id)?,
        total_words: storage.total_word_count(team_id)?,
        items_by_kind: storage.count_items_by_kind(team_id)?.into_iter().collect(),
        ai_enhanced_items: storage.count_ai_enhanced(team_id)?,
        top_topics,
        average_job_duration_ms: storage.average_job_duration_ms(team_id)?,
    })
}

/// Prints statistics to stdout in a formatted manner
///
/// # Arguments
///
/// * `stats` - The statistics to display
pub fn print_statistics(stats: &DashboardStats) {
    match &stats.team_id {
        Some(team) => println!("=== Knowledge Base Statistics ({}) ===\n", team),
        None => println!("=== Knowledge Base Statistics ===\n"),
    }

    println!("Jobs:");
    println!("  Total: {}", stats.total_jobs);
    for (status, count) in &stats.jobs_by_status {
        println!("  {}: {}", status, count);
    }
    println!("  Success rate: {:.1}%", stats.success_rate);
    if let Some(avg) = stats.average_job_duration_ms {
        println!("  Average duration: {:.0} ms", avg);
    }
    println!();

    println!("Items:");
    println!("  Total: {}", stats.total_items);
    println!("  Words: {}", stats.total_words);
    for (kind, count) in &stats.items_by_kind {
        println!("  {}: {}", kind, count);
    }
    let ai_share = if stats.total_items > 0 {
        stats.ai_enhanced_items as f64 / stats.total_items as f64 * 100.0
    } else {
        0.0
    };
    println!(
        "  AI enhanced: {} ({:.1}%)",
        stats.ai_enhanced_items, ai_share
    );
    println!();

    if !stats.top_topics.is_empty() {
        println!("Top Topics:");
        for entry in &stats.top_topics {
            println!("  - {}: {}", entry.topic, entry.count);
        }
    }
}
