use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use meditalks_core::{CulturalContext, FailureKind, Language};
use serde::{Deserialize, Serialize};

// ── Envelopes ───────────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct Success<T: Serialize> {
    pub success: bool,
    pub data: T,
}

#[derive(Serialize)]
pub struct Failure {
    pub success: bool,
    pub error: ErrorBody,
}

#[derive(Serialize)]
pub struct ErrorBody {
    pub message: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<BackendFailureJson>,
}

#[derive(Serialize)]
pub struct BackendFailureJson {
    pub backend: String,
    pub kind: FailureKind,
    pub message: String,
}

pub fn success<T: Serialize>(data: T) -> Response {
    Json(Success {
        success: true,
        data,
    })
    .into_response()
}

pub fn error(status: StatusCode, message: impl Into<String>) -> Response {
    error_with_failures(status, message, Vec::new())
}

pub fn error_with_failures(
    status: StatusCode,
    message: impl Into<String>,
    failures: Vec<BackendFailureJson>,
) -> Response {
    (
        status,
        Json(Failure {
            success: false,
            error: ErrorBody {
                message: message.into(),
                failures,
            },
        }),
    )
        .into_response()
}

// ── Adaptation ──────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct GenerateRequest {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub context: String,
    pub target_language: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct GenerateData {
    pub adapted_message: String,
    pub original_message: String,
    pub cultural_context: String,
    pub target_language: Language,
    pub source_service: String,
    pub fallback_occurred: bool,
    /// Set when every backend failed and `adapted_message` is offline text.
    pub degraded: bool,
    pub timestamp: String,
}

// ── Contexts ────────────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct ContextJson {
    pub id: &'static str,
    pub name: &'static str,
    pub region: &'static str,
    pub description: &'static str,
    pub default_language: Language,
}

impl From<&CulturalContext> for ContextJson {
    fn from(c: &CulturalContext) -> Self {
        ContextJson {
            id: c.id,
            name: c.display_name,
            region: c.region,
            description: c.description,
            default_language: c.target_language_default,
        }
    }
}

#[derive(Serialize)]
pub struct LanguageJson {
    pub code: &'static str,
    pub name: &'static str,
    pub native_name: &'static str,
}

impl From<Language> for LanguageJson {
    fn from(l: Language) -> Self {
        LanguageJson {
            code: l.code(),
            name: l.name(),
            native_name: l.native_name(),
        }
    }
}

#[derive(Serialize)]
pub struct ContextsData {
    pub contexts: Vec<ContextJson>,
    pub languages: Vec<LanguageJson>,
}

// ── Health ──────────────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: String,
    pub ai_services: AiServicesJson,
}

#[derive(Serialize)]
pub struct AiServicesJson {
    pub primary_available: bool,
    pub secondary_available: bool,
    /// First available backend, if any.
    pub primary_service: Option<String>,
    pub backends: Vec<meditalks_core::BackendStatus>,
}

pub fn timestamp() -> String {
    chrono::Utc::now().to_rfc3339()
}
