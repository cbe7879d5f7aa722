//! Markdown export of the knowledge base
//!
//! This module renders stored items as a single markdown document, one
//! section per item with its metadata above the content.

use crate::storage::{ItemRecord, Storage};
use crate::IngestError;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Upper bound on items read for one export
const EXPORT_LIMIT: usize = 1_000_000;

/// Writes a team's knowledge base (or every team's) to a markdown file
///
/// # Arguments
///
/// * `storage` - The storage backend to read items from
/// * `team_id` - Restrict to one team, or `None` for every team
/// * `output_path` - Path where the markdown file should be written
///
/// # Returns
///
/// * `Ok(usize)` - Number of items written
/// * `Err(IngestError)` - Failed to read items or write the file
pub fn export_markdown(
    storage: &dyn Storage,
    team_id: Option<&str>,
    output_path: &Path,
) -> Result<usize, IngestError> {
    let mut items = storage.list_items(team_id, EXPORT_LIMIT)?;
    items.sort_by(|a, b| {
        a.created_at
            .cmp(&b.created_at)
            .then_with(|| a.job_id.cmp(&b.job_id))
            .then_with(|| a.position.cmp(&b.position))
    });

    let markdown = format_markdown_export(&items, team_id);

    let mut file = File::create(output_path)?;
    file.write_all(markdown.as_bytes())?;

    Ok(items.len())
}

/// Formats items as a markdown document
///
/// # Arguments
///
/// * `items` - Items in the order they should appear
/// * `team_id` - Team named in the header, if any
///
/// # Returns
///
/// A formatted markdown string
pub fn format_markdown_export(items: &[ItemRecord], team_id: Option<&str>) -> String {
    let mut md = String::new();

    md.push_str("# Knowledge Base Export\n\n");
    if let Some(team) = team_id {
        md.push_str(&format!("- **Team**: {}\n", team));
    }
    md.push_str(&format!("- **Items**: {}\n", items.len()));
    let words: u64 = items.iter().map(|item| u64::from(item.word_count)).sum();
    md.push_str(&format!("- **Words**: {}\n\n", words));

    if items.is_empty() {
        md.push_str("_No items have been extracted yet._\n");
        return md;
    }

    for item in items {
        md.push_str("---\n\n");
        md.push_str(&format!("## {}\n\n", item.title));

        md.push_str(&format!("- **Source**: {}\n", item.source_ref));
        md.push_str(&format!("- **Type**: {}\n", item.content_kind));
        if let Some(author) = &item.author {
            md.push_str(&format!("- **Author**: {}\n", author));
        }
        match (item.page_start, item.page_end) {
            (Some(start), Some(end)) if start == end => {
                md.push_str(&format!("- **Page**: {}\n", start));
            }
            (Some(start), Some(end)) => {
                md.push_str(&format!("- **Pages**: {}-{}\n", start, end));
            }
            _ => {}
        }
        md.push_str(&format!("- **Topics**: {}\n", item.topics.join(", ")));
        md.push_str(&format!("- **Difficulty**: {}\n", item.difficulty));
        md.push_str(&format!(
            "- **Read time**: {} min ({} words)\n\n",
            item.read_time_minutes, item.word_count
        ));

        if !item.summary.is_empty() {
            md.push_str(&format!("> {}\n\n", item.summary));
        }

        md.push_str(item.content.trim());
        md.push_str("\n\n");
    }

    md
}
