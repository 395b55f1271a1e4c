//! Error taxonomy for the pipeline.
//!
//! Input errors are surfaced immediately and never retried. Backend failures
//! live in [`crate::llm`] and are aggregated by the orchestrator. Parse errors
//! are surfaced as-is.

use thiserror::Error;

use crate::orchestrator::OrchestrationError;

/// Caller-side problems with a request. Never retried.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InputError {
    #[error("unknown cultural context: {0}")]
    UnknownContext(String),
    #[error("unsupported target language: {0}")]
    UnsupportedLanguage(String),
    #[error("source text is empty")]
    EmptyInput,
    #[error("invalid message: {0}")]
    InvalidMessage(String),
    #[error("unsupported file format: {0}")]
    UnsupportedFormat(String),
    #[error("no extractable text in document (scanned or image-only PDF?)")]
    NoExtractableText,
}

/// Failures turning a raw model response into a structured summary.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("model returned an empty response")]
    EmptyResponse,
}

/// Terminal failure of a pipeline call.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Input(#[from] InputError),
    #[error(transparent)]
    Backend(#[from] OrchestrationError),
    #[error(transparent)]
    Parse(#[from] ParseError),
}
