//! HTML parser for article pages
//!
//! This module extracts the readable parts of a fetched page:
//! - Title (`og:title`, then `<title>`)
//! - Author (`<meta name="author">`)
//! - Body paragraphs (inside `<article>` when present, else the whole body)

use scraper::{ElementRef, Html, Selector};

/// Extracted information from an HTML page
#[derive(Debug, Clone, Default)]
pub struct ParsedArticle {
    pub title: Option<String>,
    pub author: Option<String>,

    /// Non-empty paragraph texts with whitespace collapsed
    pub paragraphs: Vec<String>,
}

/// Parses HTML content into article parts
///
/// # Example
///
/// ```
/// use kb_ingest::extract::parse_article;
///
/// let html = r#"<html><head><title>Test</title></head><body><p>Body text</p></body></html>"#;
/// let parsed = parse_article(html);
/// assert_eq!(parsed.title, Some("Test".to_string()));
/// assert_eq!(parsed.paragraphs, vec!["Body text".to_string()]);
/// ```
pub fn parse_article(html: &str) -> ParsedArticle {
    let document = Html::parse_document(html);

    let title = meta_content(&document, "meta[property='og:title']")
        .or_else(|| extract_title(&document));
    let author = meta_content(&document, "meta[name='author']");

    let mut paragraphs = select_paragraphs(&document, "article p");
    if paragraphs.is_empty() {
        paragraphs = select_paragraphs(&document, "body p");
    }

    ParsedArticle {
        title,
        author,
        paragraphs,
    }
}

/// Extracts the page title from the HTML document
fn extract_title(document: &Html) -> Option<String> {
    let title_selector = Selector::parse("title").ok()?;

    document
        .select(&title_selector)
        .next()
        .map(|element| collapse_whitespace(&element.text().collect::<String>()))
        .filter(|s| !s.is_empty())
}

fn meta_content(document: &Html, selector: &str) -> Option<String> {
    let selector = Selector::parse(selector).ok()?;

    document
        .select(&selector)
        .filter_map(|element| element.value().attr("content"))
        .map(collapse_whitespace)
        .find(|s| !s.is_empty())
}

fn select_paragraphs(document: &Html, selector: &str) -> Vec<String> {
    let Ok(selector) = Selector::parse(selector) else {
        return Vec::new();
    };

    document
        .select(&selector)
        .map(element_text)
        .filter(|text| !text.is_empty())
        .collect()
}

fn element_text(element: ElementRef<'_>) -> String {
    collapse_whitespace(&element.text().collect::<String>())
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
