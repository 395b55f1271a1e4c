use std::time::Duration;

pub mod backend;
pub mod config_file;
pub mod context;
pub mod error;
pub mod extract;
pub mod language;
pub mod llm;
pub mod offline;
pub mod orchestrator;
pub mod pipeline;
pub mod prompt;
pub mod summary;
pub mod validation;

// Re-export for convenience
pub use backend::{PdfBackend, PdfError};
pub use context::{CulturalContext, SensitiveTopic};
pub use error::{InputError, ParseError, PipelineError};
pub use extract::{Document, ExtractedText, TextExtractor};
pub use language::{Language, detect_language};
pub use llm::{AiBackend, BackendFailure, FailureKind};
pub use orchestrator::{Completion, OrchestrationError, Orchestrator, RetryPolicy};
pub use pipeline::{AdaptationRequest, AdaptationResult, BackendStatus, DocumentAnalysis, Pipeline};
pub use prompt::{PromptBuilder, PromptMode};
pub use summary::{Section, StructuredSummary, SummaryHeaders, SummaryParser, TextRun};

/// Runtime configuration for the pipeline.
#[derive(Clone)]
pub struct Config {
    pub sealion_api_key: Option<String>,
    pub sealion_base_url: Option<String>,
    pub sealion_model: Option<String>,
    pub gemini_api_key: Option<String>,
    pub gemini_base_url: Option<String>,
    pub gemini_model: Option<String>,
    /// Backend names to leave out even when keyed.
    pub disabled_backends: Vec<String>,
    /// Per-call timeout for message adaptation.
    pub adapt_timeout_secs: u64,
    /// Per-call timeout for document summarization.
    pub summary_timeout_secs: u64,
    pub retry_delay_ms: u64,
    pub max_retries: u32,
    pub summary_headers: SummaryHeaders,
    pub max_document_chars: usize,
    pub max_pages: usize,
    pub min_text_chars: usize,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("sealion_api_key", &self.sealion_api_key.as_ref().map(|_| "***"))
            .field("sealion_base_url", &self.sealion_base_url)
            .field("sealion_model", &self.sealion_model)
            .field("gemini_api_key", &self.gemini_api_key.as_ref().map(|_| "***"))
            .field("gemini_base_url", &self.gemini_base_url)
            .field("gemini_model", &self.gemini_model)
            .field("disabled_backends", &self.disabled_backends)
            .field("adapt_timeout_secs", &self.adapt_timeout_secs)
            .field("summary_timeout_secs", &self.summary_timeout_secs)
            .field("retry_delay_ms", &self.retry_delay_ms)
            .field("max_retries", &self.max_retries)
            .field("summary_headers", &self.summary_headers)
            .field("max_document_chars", &self.max_document_chars)
            .field("max_pages", &self.max_pages)
            .field("min_text_chars", &self.min_text_chars)
            .finish()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sealion_api_key: None,
            sealion_base_url: None,
            sealion_model: None,
            gemini_api_key: None,
            gemini_base_url: None,
            gemini_model: None,
            disabled_backends: vec![],
            adapt_timeout_secs: 30,
            summary_timeout_secs: 60,
            retry_delay_ms: 500,
            max_retries: 1,
            summary_headers: SummaryHeaders::default(),
            max_document_chars: prompt::DEFAULT_MAX_DOCUMENT_CHARS,
            max_pages: extract::DEFAULT_MAX_PAGES,
            min_text_chars: extract::DEFAULT_MIN_TEXT_CHARS,
        }
    }
}

impl Config {
    /// Defaults, overlaid by the config file cascade, overlaid by the
    /// process environment.
    pub fn load() -> Self {
        let mut config = Config::default();
        config_file::apply_file(&mut config, &config_file::load_config());
        config_file::apply_env(&mut config, |name| std::env::var(name).ok());
        config
    }
}

/// The shared HTTP client. Per-request timeouts are set by each backend.
pub fn build_http_client() -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder()
        .user_agent(concat!("meditalks/", env!("CARGO_PKG_VERSION")))
        .connect_timeout(Duration::from_secs(10))
        .build()
}
