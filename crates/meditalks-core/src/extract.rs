//! Document text extraction.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use tracing::debug;

use crate::backend::PdfBackend;
use crate::error::InputError;
use crate::language::{Language, detect_language};

pub const DEFAULT_MAX_PAGES: usize = 10;
pub const DEFAULT_MIN_TEXT_CHARS: usize = 10;

const PDF_MAGIC: &[u8] = b"%PDF-";

/// An uploaded document.
#[derive(Debug, Clone)]
pub struct Document {
    pub raw_bytes: Vec<u8>,
    pub file_name: String,
}

impl Document {
    pub fn new(raw_bytes: Vec<u8>, file_name: impl Into<String>) -> Self {
        Self {
            raw_bytes,
            file_name: file_name.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtractedText {
    pub plain_text: String,
    pub word_count: usize,
    /// Advisory only.
    pub detected_language: Option<Language>,
    pub page_count: usize,
    pub char_count: usize,
}

/// Turns document bytes into normalized plain text.
#[derive(Debug, Clone)]
pub struct TextExtractor {
    pub max_pages: usize,
    pub min_text_chars: usize,
}

impl Default for TextExtractor {
    fn default() -> Self {
        Self {
            max_pages: DEFAULT_MAX_PAGES,
            min_text_chars: DEFAULT_MIN_TEXT_CHARS,
        }
    }
}

impl TextExtractor {
    pub fn extract(
        &self,
        document: &Document,
        backend: &dyn PdfBackend,
    ) -> Result<ExtractedText, InputError> {
        if !is_pdf(&document.raw_bytes) {
            return Err(InputError::UnsupportedFormat(format!(
                "{} is not a PDF",
                display_name(&document.file_name)
            )));
        }

        let pages = backend
            .extract_pages(&document.raw_bytes)
            .map_err(|e| InputError::UnsupportedFormat(e.to_string()))?;

        let page_count = pages.len().min(self.max_pages);
        let joined = pages
            .iter()
            .take(page_count)
            .map(|p| p.trim())
            .filter(|p| !p.is_empty())
            .collect::<Vec<_>>()
            .join("\n\n");
        let plain_text = normalize_whitespace(&joined);

        let char_count = plain_text.chars().count();
        debug!(
            file = %document.file_name,
            pages = page_count,
            chars = char_count,
            "extracted document text"
        );
        if char_count < self.min_text_chars.max(1) {
            return Err(InputError::NoExtractableText);
        }

        Ok(ExtractedText {
            word_count: plain_text.split_whitespace().count(),
            detected_language: detect_language(&plain_text),
            page_count,
            char_count,
            plain_text,
        })
    }
}

/// Whether `bytes` start with the PDF magic prefix.
pub fn is_pdf(bytes: &[u8]) -> bool {
    bytes.starts_with(PDF_MAGIC)
}

fn display_name(file_name: &str) -> &str {
    if file_name.is_empty() { "upload" } else { file_name }
}

static INLINE_SPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[ \t\u{a0}]+").unwrap());
static BLANK_RUNS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n(?:[ \t]*\n){2,}").unwrap());

/// Collapse space runs and 3+ newlines, trim line ends and the whole text.
fn normalize_whitespace(text: &str) -> String {
    let text = text.replace("\r\n", "\n").replace('\r', "\n");
    let text = INLINE_SPACE.replace_all(&text, " ");
    let text = text
        .lines()
        .map(str::trim)
        .collect::<Vec<_>>()
        .join("\n");
    BLANK_RUNS.replace_all(&text, "\n\n").trim().to_string()
}
