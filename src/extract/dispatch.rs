//! Source-type dispatch
//!
//! Chooses an extraction strategy from the URL's host.

use crate::extract::ContentKind;
use crate::url::{extract_domain, matches_wildcard};
use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

/// Host patterns checked in order; the first match wins
const SOURCE_PATTERNS: &[(&str, SourceKind)] = &[
    ("*.substack.com", SourceKind::Substack),
    ("*.medium.com", SourceKind::Medium),
    ("*.github.com", SourceKind::Github),
    ("*.github.io", SourceKind::Github),
    ("*.gutenberg.org", SourceKind::Book),
    ("books.google.com", SourceKind::Book),
];

/// The extraction strategy for a source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Substack,
    Medium,
    Github,
    Book,
    /// Any other site
    Blog,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Substack => "substack",
            Self::Medium => "medium",
            Self::Github => "github",
            Self::Book => "book",
            Self::Blog => "blog",
        }
    }

    /// The kind of item this source produces
    pub fn content_kind(&self) -> ContentKind {
        match self {
            Self::Book => ContentKind::Chapter,
            _ => ContentKind::Article,
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Classifies a normalized URL by its host
///
/// # Example
///
/// ```
/// use kb_ingest::extract::{classify_source, SourceKind};
/// use url::Url;
///
/// let url = Url::parse("https://someone.substack.com/p/post").unwrap();
/// assert_eq!(classify_source(&url), SourceKind::Substack);
/// ```
pub fn classify_source(url: &Url) -> SourceKind {
    let Some(domain) = extract_domain(url) else {
        return SourceKind::Blog;
    };

    SOURCE_PATTERNS
        .iter()
        .find(|(pattern, _)| matches_wildcard(pattern, &domain))
        .map(|(_, kind)| *kind)
        .unwrap_or(SourceKind::Blog)
}
