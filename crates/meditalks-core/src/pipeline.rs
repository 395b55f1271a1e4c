//! The two request flows: message adaptation and document analysis.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::Config;
use crate::backend::PdfBackend;
use crate::context::{self, CulturalContext};
use crate::error::{InputError, PipelineError};
use crate::extract::{Document, TextExtractor};
use crate::language::Language;
use crate::orchestrator::Orchestrator;
use crate::prompt::{PromptBuilder, PromptMode};
use crate::summary::{StructuredSummary, SummaryParser};
use crate::validation::validate_message;

#[derive(Debug, Clone)]
pub struct AdaptationRequest {
    pub source_text: String,
    pub context_id: String,
    /// Language code; the context's default when absent.
    pub target_language: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AdaptationResult {
    pub adapted_text: String,
    pub source_service_used: String,
    pub fallback_occurred: bool,
    pub target_language: Language,
    pub context_id: &'static str,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentAnalysis {
    pub file_name: String,
    pub word_count: usize,
    pub detected_language: Option<Language>,
    pub output_language: Language,
    pub cultural_context: &'static str,
    pub analysis_source: String,
    pub fallback_occurred: bool,
    pub summary: StructuredSummary,
    /// The model's response before parsing.
    pub raw_summary: String,
}

/// Availability of one configured backend.
#[derive(Debug, Clone, Serialize)]
pub struct BackendStatus {
    pub name: String,
    pub available: bool,
}

/// Wires the registry, prompt builder, extractor, orchestrator and parser.
pub struct Pipeline {
    orchestrator: Orchestrator,
    prompts: PromptBuilder,
    parser: SummaryParser,
    extractor: TextExtractor,
    pdf: Arc<dyn PdfBackend>,
    client: reqwest::Client,
    adapt_timeout: Duration,
    summary_timeout: Duration,
}

impl Pipeline {
    pub fn new(
        config: &Config,
        orchestrator: Orchestrator,
        pdf: Arc<dyn PdfBackend>,
        client: reqwest::Client,
    ) -> Self {
        Self {
            orchestrator,
            prompts: PromptBuilder::new(config.summary_headers.clone(), config.max_document_chars),
            parser: SummaryParser::new(config.summary_headers.clone()),
            extractor: TextExtractor {
                max_pages: config.max_pages,
                min_text_chars: config.min_text_chars,
            },
            pdf,
            client,
            adapt_timeout: Duration::from_secs(config.adapt_timeout_secs),
            summary_timeout: Duration::from_secs(config.summary_timeout_secs),
        }
    }

    /// Build with the configured backends and a fresh HTTP client.
    pub fn from_config(config: &Config, pdf: Arc<dyn PdfBackend>) -> Result<Self, reqwest::Error> {
        let client = crate::build_http_client()?;
        Ok(Self::new(config, Orchestrator::from_config(config), pdf, client))
    }

    pub fn orchestrator(&self) -> &Orchestrator {
        &self.orchestrator
    }

    /// Adapt a short message for a community.
    pub async fn adapt(
        &self,
        request: &AdaptationRequest,
        cancel: &CancellationToken,
    ) -> Result<AdaptationResult, PipelineError> {
        let context = context::resolve(&request.context_id)?;
        let language = target_language(context, request.target_language.as_deref())?;
        let message = validate_message(&request.source_text)?;

        let prompt = self
            .prompts
            .build(message, context, language, PromptMode::AdaptMessage)?;
        debug!(context = context.id, %language, prompt_chars = prompt.len(), "adapting message");

        let completion = self
            .orchestrator
            .execute(&prompt, self.adapt_timeout, &self.client, cancel)
            .await?;

        Ok(AdaptationResult {
            adapted_text: completion.text,
            source_service_used: completion.source,
            fallback_occurred: completion.fallback_occurred,
            target_language: language,
            context_id: context.id,
        })
    }

    /// Extract a PDF's text and summarize it into sections.
    pub async fn analyze_document(
        &self,
        document: Document,
        context_id: &str,
        target_language_code: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<DocumentAnalysis, PipelineError> {
        let context = context::resolve(context_id)?;
        let language = target_language(context, target_language_code)?;

        let file_name = document.file_name.clone();
        let extractor = self.extractor.clone();
        let pdf = Arc::clone(&self.pdf);
        let extracted = tokio::task::spawn_blocking(move || extractor.extract(&document, pdf.as_ref()))
            .await
            .map_err(|e| InputError::UnsupportedFormat(format!("PDF extraction aborted: {e}")))??;
        info!(
            file = %file_name,
            words = extracted.word_count,
            pages = extracted.page_count,
            detected = ?extracted.detected_language,
            "document text extracted"
        );

        let prompt = self.prompts.build(
            &extracted.plain_text,
            context,
            language,
            PromptMode::SummarizeDocument,
        )?;
        debug!(context = context.id, %language, prompt_chars = prompt.len(), "summarizing document");

        let completion = self
            .orchestrator
            .execute(&prompt, self.summary_timeout, &self.client, cancel)
            .await?;
        let summary = self.parser.parse(&completion.text)?;

        Ok(DocumentAnalysis {
            file_name,
            word_count: extracted.word_count,
            detected_language: extracted.detected_language,
            output_language: language,
            cultural_context: context.id,
            analysis_source: completion.source,
            fallback_occurred: completion.fallback_occurred,
            summary,
            raw_summary: completion.text,
        })
    }

    /// Check each backend. A backend latched off after an auth failure is
    /// reported unavailable without a network call.
    pub async fn backend_status(&self, timeout: Duration) -> Vec<BackendStatus> {
        let mut statuses = Vec::with_capacity(self.orchestrator.backends().len());
        for (index, backend) in self.orchestrator.backends().iter().enumerate() {
            let available =
                self.orchestrator.is_usable(index) && backend.check_health(&self.client, timeout).await;
            statuses.push(BackendStatus {
                name: backend.name().to_string(),
                available,
            });
        }
        statuses
    }
}

/// Resolve a requested language code, falling back to the context default.
pub fn target_language(context: &CulturalContext, code: Option<&str>) -> Result<Language, InputError> {
    match code.map(str::trim).filter(|c| !c.is_empty()) {
        Some(code) => Language::from_code(code),
        None => Ok(context.target_language_default),
    }
}
