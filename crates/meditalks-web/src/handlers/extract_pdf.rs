use std::sync::Arc;

use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::response::Response;
use meditalks_core::Document;
use tracing::info;

use crate::models;
use crate::state::AppState;
use crate::upload::parse_multipart;

/// Context used when the upload form names none.
const DEFAULT_CONTEXT: &str = "thai-low-literacy";

pub async fn extract_pdf(State(state): State<Arc<AppState>>, multipart: Multipart) -> Response {
    let form = match parse_multipart(multipart).await {
        Ok(f) => f,
        Err(e) => return models::error(StatusCode::BAD_REQUEST, e),
    };

    let context = form.context.as_deref().unwrap_or(DEFAULT_CONTEXT);
    info!(
        file = %form.file.filename,
        bytes = form.file.data.len(),
        context,
        "document uploaded"
    );

    let document = Document::new(form.file.data, form.file.filename);
    let cancel = state.shutdown.child_token();
    match state
        .pipeline
        .analyze_document(document, context, form.target_language.as_deref(), &cancel)
        .await
    {
        Ok(analysis) => models::success(analysis),
        Err(err) => super::pipeline_error(err),
    }
}
