//! PDF processing module
//!
//! This module turns an uploaded PDF into chapters:
//! - Page text extraction with lopdf
//! - Chapter boundary detection from title-like lines
//! - Content cleanup and light markdown formatting

mod chapters;
mod clean;

pub use chapters::{detect_chapters, is_chapter_title, PdfChapter};
pub use clean::{clean_content, format_as_markdown};

use lopdf::Document;
use thiserror::Error;
use tracing::debug;

/// Errors that can occur while reading a PDF
#[derive(Debug, Error)]
pub enum PdfError {
    #[error("Failed to load PDF: {0}")]
    Load(#[from] lopdf::Error),

    #[error("PDF has no pages")]
    NoPages,
}

/// Extracts the text of every page
///
/// Pages are numbered from 1. A page whose text cannot be decoded yields an
/// empty string rather than failing the document.
///
/// # Returns
///
/// * `Ok(Vec<(u32, String)>)` - Page number and text, in page order
/// * `Err(PdfError)` - The bytes are not a readable PDF
pub fn extract_pages(bytes: &[u8]) -> Result<Vec<(u32, String)>, PdfError> {
    let document = Document::load_mem(bytes)?;
    let pages = document.get_pages();

    if pages.is_empty() {
        return Err(PdfError::NoPages);
    }

    Ok(pages
        .keys()
        .map(|&number| {
            let text = document.extract_text(&[number]).unwrap_or_else(|e| {
                debug!("No text on page {}: {}", number, e);
                String::new()
            });
            (number, text)
        })
        .collect())
}

/// Extracts pages and detects chapters in one step
pub fn extract_chapters(bytes: &[u8]) -> Result<Vec<PdfChapter>, PdfError> {
    let pages = extract_pages(bytes)?;
    Ok(detect_chapters(&pages))
}
