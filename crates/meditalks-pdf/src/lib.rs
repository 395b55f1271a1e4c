use std::panic::{AssertUnwindSafe, catch_unwind};

use tracing::warn;

use meditalks_core::{PdfBackend, PdfError};

/// pdf-extract based implementation of [`PdfBackend`].
///
/// Keeps the PDF library out of the core crate. Reads the text layer only;
/// image-only pages come back empty and the core extractor decides what
/// that means.
#[derive(Debug, Default, Clone, Copy)]
pub struct PdfExtractBackend;

impl PdfExtractBackend {
    pub fn new() -> Self {
        Self
    }
}

impl PdfBackend for PdfExtractBackend {
    fn extract_pages(&self, bytes: &[u8]) -> Result<Vec<String>, PdfError> {
        // pdf-extract panics on some malformed fonts and streams.
        let result = catch_unwind(AssertUnwindSafe(|| {
            pdf_extract::extract_text_from_mem_by_pages(bytes)
        }));

        match result {
            Ok(Ok(pages)) => Ok(pages),
            Ok(Err(e)) => Err(PdfError::ParseError(e.to_string())),
            Err(_) => {
                warn!(bytes = bytes.len(), "PDF text extraction panicked");
                Err(PdfError::ExtractionError(
                    "PDF text extraction failed".to_string(),
                ))
            }
        }
    }
}
