//! URL handling module for kb-ingest
//!
//! This module provides source URL normalization, domain extraction, host
//! pattern matching, and the key used to recognise previously processed URLs.

mod domain;
mod matcher;
mod normalize;

use url::Url;

// Re-export main functions
pub use domain::extract_domain;
pub use matcher::matches_wildcard;
pub use normalize::normalize_url;

/// Builds the scheme-insensitive key used for freshness lookups
///
/// `http://example.com/a` and `https://www.example.com/a/` share a key.
/// The input should already be normalized.
///
/// # Examples
///
/// ```
/// use kb_ingest::url::{freshness_key, normalize_url};
///
/// let a = normalize_url("http://www.example.com/a/").unwrap();
/// let b = normalize_url("https://example.com/a").unwrap();
/// assert_eq!(freshness_key(&a), freshness_key(&b));
/// ```
pub fn freshness_key(url: &Url) -> String {
    let host = url.host_str().unwrap_or_default();
    let mut key = match url.port() {
        Some(port) => format!("{}:{}{}", host, port, url.path()),
        None => format!("{}{}", host, url.path()),
    };

    if let Some(query) = url.query() {
        key.push('?');
        key.push_str(query);
    }

    key
}
