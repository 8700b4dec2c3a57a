//! Page text extraction for report files.
//!
//! Report files arrive as bytes plus a content type; this module returns
//! their text one page at a time. A page that cannot be decoded contributes
//! an empty string and a warning, it never fails the whole document.

use thiserror::Error;
use tracing::{debug, warn};

pub const MIME_PDF: &str = "application/pdf";
pub const MIME_TEXT: &str = "text/plain";

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("unsupported content-type: {0}")]
    UnsupportedContentType(String),
    #[error("PDF extraction failed: {0}")]
    Pdf(String),
}

/// Ordered per-page text of one document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedPages {
    pub pages: Vec<String>,
}

impl ExtractedPages {
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Join readable pages into one text, each prefixed by a page marker.
    pub fn full_text(&self) -> String {
        let mut text = String::new();
        for (idx, page) in self.pages.iter().enumerate() {
            if page.trim().is_empty() {
                continue;
            }
            text.push_str(&format!("\n--- Page {} ---\n{}", idx + 1, page));
        }
        text.trim().to_string()
    }
}

/// Content type for a report file, judged by extension.
pub fn content_type_for(filename: &str) -> Option<&'static str> {
    let lower = filename.to_ascii_lowercase();
    if lower.ends_with(".pdf") {
        Some(MIME_PDF)
    } else if lower.ends_with(".txt") {
        Some(MIME_TEXT)
    } else {
        None
    }
}

pub fn extract_pages(bytes: &[u8], content_type: &str) -> Result<ExtractedPages, ExtractError> {
    match content_type {
        MIME_PDF => extract_pdf(bytes),
        MIME_TEXT => Ok(ExtractedPages {
            pages: vec![String::from_utf8_lossy(bytes).into_owned()],
        }),
        _ => Err(ExtractError::UnsupportedContentType(
            content_type.to_string(),
        )),
    }
}

fn extract_pdf(bytes: &[u8]) -> Result<ExtractedPages, ExtractError> {
    let doc = lopdf::Document::load_mem(bytes).map_err(|e| ExtractError::Pdf(e.to_string()))?;
    if doc.is_encrypted() {
        return Err(ExtractError::Pdf("document is encrypted".to_string()));
    }

    let page_numbers: Vec<u32> = doc.get_pages().keys().copied().collect();
    debug!(pages = page_numbers.len(), "extracting PDF text");

    let mut pages = Vec::with_capacity(page_numbers.len());
    for number in page_numbers {
        match doc.extract_text(&[number]) {
            Ok(text) => pages.push(text),
            Err(e) => {
                warn!(page = number, error = %e, "could not extract page text");
                pages.push(String::new());
            }
        }
    }

    Ok(ExtractedPages { pages })
}
