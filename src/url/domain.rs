use url::Url;

/// Extracts the lowercase host from a URL
///
/// # Examples
///
/// ```
/// use url::Url;
/// use kb_ingest::url::extract_domain;
///
/// let url = Url::parse("https://Writer.Substack.com/p/essay").unwrap();
/// assert_eq!(extract_domain(&url), Some("writer.substack.com".to_string()));
/// ```
pub fn extract_domain(url: &Url) -> Option<String> {
    url.host_str().map(|h| h.to_lowercase())
}
