//! Content extraction module
//!
//! This module turns a normalized source URL into knowledge base items:
//! - Classifying the source by host pattern
//! - Rendering canned items for each source kind
//! - Fetching and parsing generic blog pages when enabled

mod dispatch;
mod fetcher;
mod parser;
mod templates;

pub use dispatch::{classify_source, SourceKind};
pub use fetcher::{build_http_client, fetch_page, FetchResult};
pub use parser::{parse_article, ParsedArticle};
pub use templates::{render_items, title_from_url};

use crate::config::ExtractionConfig;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, warn};
use url::Url;

/// What kind of knowledge base item a piece of content is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    /// A section of a book or long document
    Chapter,

    /// A standalone post or page
    Article,
}

impl ContentKind {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Chapter => "chapter",
            Self::Article => "article",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "chapter" => Some(Self::Chapter),
            "article" => Some(Self::Article),
            _ => None,
        }
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_string())
    }
}

/// One piece of content produced by an extraction strategy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedItem {
    pub title: String,
    pub content: String,
    pub author: Option<String>,
    pub content_kind: ContentKind,
}

/// Runs the extraction strategy chosen for a source kind
pub struct Extractor {
    /// Present only when live page fetching is enabled
    client: Option<Client>,
    max_page_bytes: usize,
}

impl Extractor {
    /// Creates an extractor from the extraction configuration
    ///
    /// # Returns
    ///
    /// * `Ok(Extractor)` - Ready to extract
    /// * `Err(reqwest::Error)` - The HTTP client could not be built
    pub fn new(config: &ExtractionConfig) -> Result<Self, reqwest::Error> {
        let client = if config.fetch_pages {
            Some(build_http_client(&config.user_agent)?)
        } else {
            None
        };

        Ok(Self {
            client,
            max_page_bytes: config.max_page_bytes,
        })
    }

    /// Extracts items from `url`
    ///
    /// Generic blogs are fetched and parsed when a client is configured.
    /// Every other case, and every fetch or parse failure, uses the canned
    /// template, so this never fails.
    pub async fn extract(&self, kind: SourceKind, url: &Url) -> Vec<ExtractedItem> {
        if let (SourceKind::Blog, Some(client)) = (kind, &self.client) {
            if let Some(item) = self.extract_live(client, url).await {
                return vec![item];
            }
        }

        render_items(kind, url)
    }

    async fn extract_live(&self, client: &Client, url: &Url) -> Option<ExtractedItem> {
        let body = match fetch_page(client, url, self.max_page_bytes).await {
            FetchResult::Success { body, final_url } => {
                debug!("Fetched {} ({} bytes)", final_url, body.len());
                body
            }
            FetchResult::ContentMismatch { content_type } => {
                warn!("{} is not HTML ({}), using template", url, content_type);
                return None;
            }
            FetchResult::TooLarge { limit } => {
                warn!("{} exceeds {} bytes, using template", url, limit);
                return None;
            }
            FetchResult::HttpError { status_code } => {
                warn!("{} returned HTTP {}, using template", url, status_code);
                return None;
            }
            FetchResult::NetworkError { error } => {
                warn!("Failed to fetch {}: {}, using template", url, error);
                return None;
            }
        };

        let parsed = parse_article(&body);
        if parsed.paragraphs.is_empty() {
            warn!("No paragraphs found on {}, using template", url);
            return None;
        }

        Some(ExtractedItem {
            title: parsed.title.unwrap_or_else(|| title_from_url(url)),
            content: parsed.paragraphs.join("\n\n"),
            author: parsed.author,
            content_kind: ContentKind::Article,
        })
    }
}
