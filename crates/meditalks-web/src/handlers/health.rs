use std::sync::Arc;

use axum::Json;
use axum::extract::State;

use crate::models::{self, AiServicesJson, HealthResponse};
use crate::state::AppState;

/// Liveness plus a live health check of each configured backend.
///
/// Always answers 200; backend trouble shows up in `ai_services`.
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let backends = state.pipeline.backend_status(state.health_timeout).await;

    let available = |i: usize| backends.get(i).is_some_and(|b| b.available);
    let ai_services = AiServicesJson {
        primary_available: available(0),
        secondary_available: available(1),
        primary_service: backends
            .iter()
            .find(|b| b.available)
            .map(|b| b.name.clone()),
        backends: backends.clone(),
    };

    Json(HealthResponse {
        status: "healthy",
        timestamp: models::timestamp(),
        ai_services,
    })
}
