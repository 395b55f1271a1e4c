pub mod contexts;
pub mod extract_pdf;
pub mod generate;
pub mod health;

use axum::http::StatusCode;
use axum::response::Response;
use meditalks_core::{OrchestrationError, PipelineError};

use crate::models::{self, BackendFailureJson};

/// Map a pipeline failure onto a status code and error envelope.
pub(crate) fn pipeline_error(err: PipelineError) -> Response {
    match err {
        PipelineError::Input(e) => models::error(StatusCode::BAD_REQUEST, e.to_string()),
        PipelineError::Parse(e) => models::error(StatusCode::BAD_GATEWAY, e.to_string()),
        PipelineError::Backend(OrchestrationError::AllFailed { failures }) => {
            let failures = failures
                .into_iter()
                .map(|(backend, f)| BackendFailureJson {
                    backend,
                    kind: f.kind,
                    message: f.message,
                })
                .collect();
            models::error_with_failures(
                StatusCode::SERVICE_UNAVAILABLE,
                "AI services are currently unavailable",
                failures,
            )
        }
        PipelineError::Backend(e) => {
            models::error(StatusCode::SERVICE_UNAVAILABLE, e.to_string())
        }
    }
}
