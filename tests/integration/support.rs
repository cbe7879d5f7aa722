//! Shared helpers for the integration tests

#![allow(dead_code)]

use kb_ingest::config::{Config, EnhancerConfig, ExtractionConfig, ServerConfig, StorageConfig};
use kb_ingest::storage::SqliteStorage;
use kb_ingest::{Pipeline, ProgressEvent};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

/// Configuration with no step delay, no page fetching and no AI
pub fn test_config() -> Config {
    Config {
        server: ServerConfig::default(),
        storage: StorageConfig {
            database_path: ":memory:".to_string(),
        },
        extraction: ExtractionConfig {
            step_delay_ms: 0,
            fetch_pages: false,
            ..ExtractionConfig::default()
        },
        enhancer: EnhancerConfig {
            enabled: false,
            ..EnhancerConfig::default()
        },
    }
}

/// Builds a pipeline over a fresh in-memory database
pub fn build_pipeline(config: &Config) -> Arc<Pipeline> {
    let storage = Arc::new(Mutex::new(SqliteStorage::new_in_memory().unwrap()));
    Arc::new(Pipeline::new(config, storage).unwrap())
}

/// Builds a pipeline over a database file at `path`
pub fn build_pipeline_at(config: &Config, path: &Path) -> Arc<Pipeline> {
    let storage = Arc::new(Mutex::new(SqliteStorage::new(path).unwrap()));
    Arc::new(Pipeline::new(config, storage).unwrap())
}

/// Collects every event already sent on a finished run's channel
pub fn drain(mut rx: mpsc::Receiver<ProgressEvent>) -> Vec<ProgressEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

/// Progress values in the order they were sent
pub fn progress_values(events: &[ProgressEvent]) -> Vec<u8> {
    events
        .iter()
        .filter_map(|event| match event {
            ProgressEvent::Progress { progress, .. } => Some(*progress),
            _ => None,
        })
        .collect()
}

/// Builds a PDF with one text line per BT/ET block
pub fn build_pdf(pages: &[&[&str]]) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut kids = Vec::new();
    for lines in pages {
        let mut operations = Vec::new();
        for (i, line) in lines.iter().enumerate() {
            operations.push(Operation::new("BT", vec![]));
            operations.push(Operation::new("Tf", vec!["F1".into(), 12.into()]));
            operations.push(Operation::new(
                "Td",
                vec![72.into(), (720 - 16 * i as i64).into()],
            ));
            operations.push(Operation::new("Tj", vec![Object::string_literal(*line)]));
            operations.push(Operation::new("ET", vec![]));
        }
        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources_id,
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).unwrap();
    bytes
}

/// A two-chapter book spread over three pages
pub fn sample_book() -> Vec<u8> {
    build_pdf(&[
        &[
            "Chapter 1: The Harbor",
            "Ships arrived at the harbor every morning.",
        ],
        &["The sailors unloaded their cargo before noon."],
        &[
            "Chapter 2: The Storm",
            "A storm gathered over the sea that night.",
        ],
    ])
}
