use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::Response;
use meditalks_core::offline::{OFFLINE_SOURCE, offline_adaptation};
use meditalks_core::pipeline::target_language;
use meditalks_core::{AdaptationRequest, Language, OrchestrationError, PipelineError, context};
use tracing::{info, warn};

use crate::models::{self, GenerateData, GenerateRequest};
use crate::state::AppState;

pub async fn generate(
    State(state): State<Arc<AppState>>,
    body: Result<Json<GenerateRequest>, JsonRejection>,
) -> Response {
    let Json(req) = match body {
        Ok(body) => body,
        Err(rejection) => {
            return models::error(
                StatusCode::BAD_REQUEST,
                format!("Invalid request body: {}", rejection.body_text()),
            );
        }
    };

    let request = AdaptationRequest {
        source_text: req.message,
        context_id: req.context,
        target_language: req.target_language,
    };
    let cancel = state.shutdown.child_token();

    match state.pipeline.adapt(&request, &cancel).await {
        Ok(result) => {
            info!(
                context = result.context_id,
                source = %result.source_service_used,
                fallback = result.fallback_occurred,
                "message adapted"
            );
            models::success(GenerateData {
                adapted_message: result.adapted_text,
                original_message: request.source_text.trim().to_string(),
                cultural_context: result.context_id.to_string(),
                target_language: result.target_language,
                source_service: result.source_service_used,
                fallback_occurred: result.fallback_occurred,
                degraded: false,
                timestamp: models::timestamp(),
            })
        }
        Err(PipelineError::Backend(
            err @ (OrchestrationError::AllFailed { .. } | OrchestrationError::NoBackends),
        )) => {
            warn!(error = %err, "serving offline adaptation");
            degraded(&request)
        }
        Err(err) => super::pipeline_error(err),
    }
}

/// Offline text for a request that already passed validation.
fn degraded(request: &AdaptationRequest) -> Response {
    // The pipeline validated both before reaching the backends.
    let language = context::resolve(&request.context_id)
        .and_then(|ctx| target_language(ctx, request.target_language.as_deref()))
        .unwrap_or(Language::En);
    let message = request.source_text.trim();

    models::success(GenerateData {
        adapted_message: offline_adaptation(message, language),
        original_message: message.to_string(),
        cultural_context: request.context_id.clone(),
        target_language: language,
        source_service: OFFLINE_SOURCE.to_string(),
        fallback_occurred: true,
        degraded: true,
        timestamp: models::timestamp(),
    })
}
