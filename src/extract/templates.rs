//! Canned extraction templates
//!
//! Each source kind renders a fixed set of items whose titles come from the
//! URL. Output is deterministic for a given URL.

use crate::extract::{ContentKind, ExtractedItem, SourceKind};
use crate::url::extract_domain;
use std::borrow::Cow;
use url::Url;

/// Renders the template items for a source
///
/// | Kind | Items |
/// |------|-------|
/// | Book | 3 chapters |
/// | Github | 2 articles (overview, getting started) |
/// | Substack, Medium, Blog | 1 article |
pub fn render_items(kind: SourceKind, url: &Url) -> Vec<ExtractedItem> {
    let title = title_from_url(url);
    let author = author_from_url(kind, url);

    match kind {
        SourceKind::Book => (1..=3)
            .map(|n| ExtractedItem {
                title: format!("Chapter {}: {}", n, BOOK_CHAPTERS[n - 1].0),
                content: format!(
                    "# {}\n\n{}\n\n{}",
                    BOOK_CHAPTERS[n - 1].0,
                    BOOK_CHAPTERS[n - 1].1,
                    format_source_line(&title, url)
                ),
                author: author.clone(),
                content_kind: ContentKind::Chapter,
            })
            .collect(),

        SourceKind::Github => vec![
            ExtractedItem {
                title: format!("{}: Overview", title),
                content: format!(
                    "# {}\n\n{} is a software project hosted on GitHub. The README describes \
                     what the project does, the problems it solves, and how its code is \
                     organized into modules.\n\nThe repository includes source code, tests, \
                     and documentation. Contributions are welcome through pull requests.\n\n{}",
                    title,
                    title,
                    format_source_line(&title, url)
                ),
                author: author.clone(),
                content_kind: ContentKind::Article,
            },
            ExtractedItem {
                title: format!("{}: Getting Started", title),
                content: format!(
                    "# Getting Started\n\nClone the repository and install the dependencies \
                     listed in the project documentation. Run the test suite to verify the \
                     setup before making changes.\n\nConfiguration options are documented in \
                     the repository. Open an issue if the build fails on your platform.\n\n{}",
                    format_source_line(&title, url)
                ),
                author,
                content_kind: ContentKind::Article,
            },
        ],

        SourceKind::Substack | SourceKind::Medium | SourceKind::Blog => {
            let publication = match kind {
                SourceKind::Substack => "newsletter post",
                SourceKind::Medium => "Medium story",
                _ => "blog post",
            };

            vec![ExtractedItem {
                title: title.clone(),
                content: format!(
                    "# {}\n\nThis {} introduces {} and explains the key ideas behind it. \
                     The author walks through the background, the main arguments, and \
                     practical takeaways for readers.\n\nThe post closes with a short summary \
                     and suggestions for further reading.\n\n{}",
                    title,
                    publication,
                    title.to_lowercase(),
                    format_source_line(&title, url)
                ),
                author,
                content_kind: ContentKind::Article,
            }]
        }
    }
}

const BOOK_CHAPTERS: [(&str, &str); 3] = [
    (
        "Introduction",
        "The opening chapter sets out the subject of the book and the questions it \
         will answer. It introduces the main characters and ideas that the rest of \
         the text builds on.",
    ),
    (
        "Development",
        "The middle chapter develops the central themes in detail. Examples and \
         arguments from earlier are expanded, and new complications are introduced.",
    ),
    (
        "Conclusion",
        "The final chapter draws the threads together. It summarizes what was learned \
         and reflects on the lasting significance of the work.",
    ),
];

fn format_source_line(title: &str, url: &Url) -> String {
    format!("Source: {} ({})", title, url)
}

/// Builds a display title from a URL
///
/// The last non-empty path segment is turned from a slug into Title Case,
/// dropping any file extension. Falls back to the domain when the path is
/// empty.
///
/// # Example
///
/// ```
/// use kb_ingest::extract::title_from_url;
/// use url::Url;
///
/// let url = Url::parse("https://example.com/posts/my-first_post.html").unwrap();
/// assert_eq!(title_from_url(&url), "My First Post");
/// ```
pub fn title_from_url(url: &Url) -> String {
    let slug = url
        .path_segments()
        .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
        .map(|segment| urlencoding::decode(segment).unwrap_or(Cow::Borrowed(segment)));

    let title = slug
        .map(|segment| match segment.rsplit_once('.') {
            Some((stem, _)) if !stem.is_empty() => slug_to_title(stem),
            _ => slug_to_title(&segment),
        })
        .unwrap_or_default();
    if title.is_empty() {
        extract_domain(url).unwrap_or_else(|| url.to_string())
    } else {
        title
    }
}

fn slug_to_title(slug: &str) -> String {
    slug.split(|c: char| c == '-' || c == '_' || c == '+' || c.is_whitespace())
        .filter(|word| !word.is_empty() && !word.starts_with('@'))
        .map(capitalize)
        .collect::<Vec<_>>()
        .join(" ")
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Author hints that can be read from the URL alone
///
/// Substack publications are named by subdomain and Medium profiles by an
/// `@handle` path segment.
fn author_from_url(kind: SourceKind, url: &Url) -> Option<String> {
    match kind {
        SourceKind::Substack => {
            let domain = extract_domain(url)?;
            domain
                .strip_suffix(".substack.com")
                .map(|name| name.to_string())
        }
        SourceKind::Medium => url
            .path_segments()?
            .find_map(|segment| segment.strip_prefix('@'))
            .filter(|handle| !handle.is_empty())
            .map(|handle| handle.to_string()),
        _ => None,
    }
}
