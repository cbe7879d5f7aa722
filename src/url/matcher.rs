/// Checks if a domain matches a host pattern
///
/// `*.example.com` matches `example.com` and any subdomain of it; any other
/// pattern must match exactly. Both sides are expected in lowercase.
///
/// # Examples
///
/// ```
/// use kb_ingest::url::matches_wildcard;
///
/// assert!(matches_wildcard("*.substack.com", "writer.substack.com"));
/// assert!(matches_wildcard("*.substack.com", "substack.com"));
/// assert!(!matches_wildcard("*.substack.com", "notsubstack.com"));
/// assert!(matches_wildcard("books.google.com", "books.google.com"));
/// ```
pub fn matches_wildcard(pattern: &str, candidate: &str) -> bool {
    match pattern.strip_prefix("*.") {
        Some(base) => {
            candidate == base
                || candidate
                    .strip_suffix(base)
                    .is_some_and(|prefix| prefix.ends_with('.'))
        }
        None => candidate == pattern,
    }
}
