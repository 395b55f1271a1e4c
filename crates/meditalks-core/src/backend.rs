use thiserror::Error;

#[derive(Error, Debug)]
pub enum PdfError {
    #[error("failed to parse PDF: {0}")]
    ParseError(String),
    #[error("failed to extract text: {0}")]
    ExtractionError(String),
}

/// Trait for PDF text-layer backends.
///
/// Implementors only pull page text out of the bytes; format checks,
/// normalization and the empty-text policy live in
/// [`TextExtractor`](crate::extract::TextExtractor).
pub trait PdfBackend: Send + Sync {
    /// Extract the text of each page, in page order.
    fn extract_pages(&self, bytes: &[u8]) -> Result<Vec<String>, PdfError>;
}
