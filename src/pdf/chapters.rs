//! Chapter boundary detection
//!
//! A chapter starts at any line that looks like a title and runs until the
//! next one. Text before the first title is not part of any chapter.

use crate::pdf::clean::{clean_content, is_uppercase_line};
use regex::Regex;
use serde::Serialize;
use std::sync::OnceLock;

/// Title used when a document has no detectable chapter headings
pub const WHOLE_DOCUMENT_TITLE: &str = "Complete Document";

/// A chapter detected in a PDF
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PdfChapter {
    pub title: String,
    pub content: String,
    pub page_start: u32,
    pub page_end: u32,
    pub word_count: u32,
}

fn title_patterns() -> &'static [Regex] {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            r"(?i)^chapter\s+\d+[:\-\s]",
            r"^\d+\.\s+[A-Z]",
            r"^[A-Z][A-Z\s]{10,}$",
            r"^\d+\s+[A-Z]",
            r"(?i)^part\s+[IVX]+[:\-\s]",
        ]
        .iter()
        .map(|pattern| Regex::new(pattern).expect("valid chapter title pattern"))
        .collect()
    })
}

/// Checks if a trimmed line looks like a chapter title
///
/// Lines outside 5..=100 characters never qualify. Otherwise the line must
/// match a heading pattern (`Chapter 3:`, `4. Title`, `PART IV -`, ...) or be
/// all uppercase and 10..=50 characters long.
pub fn is_chapter_title(line: &str) -> bool {
    let len = line.chars().count();
    if !(5..=100).contains(&len) {
        return false;
    }

    if title_patterns().iter().any(|re| re.is_match(line)) {
        return true;
    }

    is_uppercase_line(line) && (10..=50).contains(&len)
}

struct OpenChapter {
    title: String,
    content: String,
    page_start: u32,
}

impl OpenChapter {
    fn close(self, page_end: u32) -> PdfChapter {
        let content = clean_content(&self.content);
        let word_count = content.split_whitespace().count() as u32;
        PdfChapter {
            title: self.title,
            content,
            page_start: self.page_start,
            page_end: page_end.max(self.page_start),
            word_count,
        }
    }
}

/// Splits page text into chapters
///
/// # Arguments
///
/// * `pages` - Page number and text pairs, in page order
///
/// # Returns
///
/// The detected chapters. A chapter ends on the page before the next title's
/// page (or the title's own page when they share one); the last chapter ends
/// on the last page. Without any title, the whole document becomes a single
/// chapter titled "Complete Document". An empty page list yields nothing.
pub fn detect_chapters(pages: &[(u32, String)]) -> Vec<PdfChapter> {
    let mut chapters = Vec::new();
    let mut current: Option<OpenChapter> = None;

    for (page, text) in pages {
        for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
            if is_chapter_title(line) {
                if let Some(open) = current.take() {
                    chapters.push(open.close(page.saturating_sub(1)));
                }
                current = Some(OpenChapter {
                    title: line.to_string(),
                    content: String::new(),
                    page_start: *page,
                });
            } else if let Some(open) = current.as_mut() {
                open.content.push_str(line);
                open.content.push('\n');
            }
        }
    }

    let (Some(first), Some(last)) = (pages.first(), pages.last()) else {
        return chapters;
    };

    if let Some(open) = current {
        chapters.push(open.close(last.0));
    }

    if chapters.is_empty() {
        let full_text = pages
            .iter()
            .map(|(_, text)| text.as_str())
            .collect::<Vec<_>>()
            .join("\n");

        chapters.push(
            OpenChapter {
                title: WHOLE_DOCUMENT_TITLE.to_string(),
                content: full_text,
                page_start: first.0,
            }
            .close(last.0),
        );
    }

    chapters
}
