use crate::UrlError;
use url::Url;

/// Query parameters that only carry referral or campaign data
///
/// Newsletter platforms append their own share markers (`r`, `sk`,
/// `triedRedirect`) on top of the usual campaign tags.
const TRACKING_PARAMS: &[&str] = &[
    "fbclid",
    "gclid",
    "mc_eid",
    "ref",
    "source",
    "r",
    "sk",
    "triedRedirect",
];

/// Normalizes a submitted source URL
///
/// Two submissions of the same article should produce the same normalized
/// URL so the freshness check can find earlier jobs.
///
/// # Normalization Steps
///
/// 1. Trim surrounding whitespace and parse; reject if malformed
/// 2. Require an HTTP or HTTPS scheme
/// 3. Lowercase the host and drop a leading `www.`
/// 4. Collapse empty and dot segments, drop the trailing slash (root stays `/`)
/// 5. Drop the fragment
/// 6. Drop tracking parameters and sort the rest by key
///
/// The scheme is preserved so the URL can still be fetched as given; use
/// [`freshness_key`](super::freshness_key) for scheme-insensitive matching.
///
/// # Examples
///
/// ```
/// use kb_ingest::url::normalize_url;
///
/// let url = normalize_url("https://WWW.Example.com/posts/hello/?utm_source=x").unwrap();
/// assert_eq!(url.as_str(), "https://example.com/posts/hello");
/// ```
pub fn normalize_url(url_str: &str) -> Result<Url, UrlError> {
    let trimmed = url_str.trim();
    if trimmed.is_empty() {
        return Err(UrlError::Parse("URL is empty".to_string()));
    }

    let mut url = Url::parse(trimmed).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS sources are supported, got: {}",
            url.scheme()
        )));
    }

    let host = url
        .host_str()
        .filter(|h| !h.is_empty())
        .ok_or(UrlError::MissingDomain)?
        .to_lowercase();
    let host = host.strip_prefix("www.").unwrap_or(&host).to_string();
    url.set_host(Some(&host))
        .map_err(|e| UrlError::Malformed(format!("Failed to set host: {}", e)))?;

    let path = normalize_path(url.path());
    url.set_path(&path);

    url.set_fragment(None);

    if url.query().is_some() {
        let kept = kept_query_params(&url);
        if kept.is_empty() {
            url.set_query(None);
        } else {
            // Re-encode so values holding '&', '=' or '+' survive
            url.query_pairs_mut().clear().extend_pairs(kept.iter());
        }
    }

    Ok(url)
}

/// Collapses empty and dot segments and removes the trailing slash
fn normalize_path(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();

    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }

    if segments.is_empty() {
        "/".to_string()
    } else {
        format!("/{}", segments.join("/"))
    }
}

/// Returns the non-tracking query parameters sorted by key
fn kept_query_params(url: &Url) -> Vec<(String, String)> {
    let mut params: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| !is_tracking_param(key))
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    params.sort_by(|a, b| a.0.cmp(&b.0));
    params
}

fn is_tracking_param(key: &str) -> bool {
    key.starts_with("utm_") || TRACKING_PARAMS.contains(&key)
}
