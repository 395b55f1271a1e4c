use std::sync::Arc;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::http::{StatusCode, Uri};
use axum::response::Response;
use axum::routing::{get, post};
use tower_http::cors::CorsLayer;

use crate::handlers;
use crate::models;
use crate::state::AppState;

pub const GENERATE_PATH: &str = "/api/cultural-adaptation/generate";

/// Assemble the API router.
pub fn router(state: Arc<AppState>, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/api/health", get(handlers::health::health))
        .route("/api/cultural-adaptation/contexts", get(handlers::contexts::contexts))
        .route(GENERATE_PATH, post(handlers::generate::generate))
        .route("/api/extract-pdf", post(handlers::extract_pdf::extract_pdf))
        .fallback(not_found)
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn not_found(uri: Uri) -> Response {
    models::error(StatusCode::NOT_FOUND, format!("No route for {}", uri.path()))
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use axum::body::Body;
    use axum::http::{Request, header};
    use http_body_util::BodyExt;
    use meditalks_core::llm::{AiBackend, FailureKind, MockLlm, MockReply};
    use meditalks_core::{Config, Orchestrator, PdfBackend, PdfError, Pipeline};
    use serde_json::{Value, json};
    use tokio_util::sync::CancellationToken;
    use tower::ServiceExt;

    use super::*;

    struct FixedPdf(&'static str);

    impl PdfBackend for FixedPdf {
        fn extract_pages(&self, _bytes: &[u8]) -> Result<Vec<String>, PdfError> {
            Ok(vec![self.0.to_string()])
        }
    }

    fn app(backends: Vec<Arc<MockLlm>>) -> Router {
        let list: Vec<Arc<dyn AiBackend>> = backends
            .into_iter()
            .map(|b| b as Arc<dyn AiBackend>)
            .collect();
        let pipeline = Pipeline::new(
            &Config::default(),
            Orchestrator::new(list),
            Arc::new(FixedPdf(
                "Discharge summary. Take amoxicillin three times a day for seven days.",
            )),
            reqwest::Client::new(),
        );
        let state = Arc::new(AppState {
            pipeline,
            shutdown: CancellationToken::new(),
            health_timeout: Duration::from_secs(1),
        });
        router(state, 1024 * 1024)
    }

    async fn send(app: Router, req: Request<Body>) -> (StatusCode, Value) {
        let resp = app.oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::post(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn multipart(parts: &[(&str, Option<&str>, &[u8])]) -> Request<Body> {
        let mut body = Vec::new();
        for (name, filename, data) in parts {
            body.extend_from_slice(b"--BOUNDARY\r\n");
            match filename {
                Some(f) => body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{name}\"; filename=\"{f}\"\r\n\
                         Content-Type: application/pdf\r\n\r\n"
                    )
                    .as_bytes(),
                ),
                None => body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
                ),
            }
            body.extend_from_slice(data);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(b"--BOUNDARY--\r\n");
        Request::post("/api/extract-pdf")
            .header(header::CONTENT_TYPE, "multipart/form-data; boundary=BOUNDARY")
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn generate_success() {
        let primary = Arc::new(MockLlm::new("SEA-Lion", MockReply::text("Uminom po ng gamot")));
        let (status, body) = send(
            app(vec![primary]),
            post_json(
                "/api/cultural-adaptation/generate",
                json!({"message": "Take your medication daily", "context": "tagalog-rural"}),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        let data = &body["data"];
        assert_eq!(data["adapted_message"], "Uminom po ng gamot");
        assert_eq!(data["original_message"], "Take your medication daily");
        assert_eq!(data["target_language"], "tl");
        assert_eq!(data["source_service"], "SEA-Lion");
        assert_eq!(data["fallback_occurred"], false);
        assert_eq!(data["degraded"], false);
    }

    #[tokio::test]
    async fn generate_rejects_bad_input() {
        let primary = Arc::new(MockLlm::new("SEA-Lion", MockReply::text("unused")));

        let (status, body) = send(
            app(vec![Arc::clone(&primary)]),
            post_json(
                "/api/cultural-adaptation/generate",
                json!({"message": "Take your medication daily", "context": "atlantis"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
        assert!(body["error"]["message"].as_str().unwrap().contains("atlantis"));

        let (status, _) = send(
            app(vec![Arc::clone(&primary)]),
            post_json("/api/cultural-adaptation/generate", json!({"message": "   ", "context": "tagalog-rural"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let req = Request::post("/api/cultural-adaptation/generate")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let (status, body) = send(app(vec![Arc::clone(&primary)]), req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);

        assert_eq!(primary.call_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn generate_degrades_when_backends_fail() {
        let primary = Arc::new(MockLlm::new("SEA-Lion", MockReply::Fail(FailureKind::Unreachable)));
        let secondary = Arc::new(MockLlm::new("Gemini", MockReply::Fail(FailureKind::AuthError)));
        let (status, body) = send(
            app(vec![primary, secondary]),
            post_json(
                "/api/cultural-adaptation/generate",
                json!({
                    "message": "Take your medication daily",
                    "context": "thai-low-literacy",
                    "target_language": "en"
                }),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        let data = &body["data"];
        assert_eq!(data["degraded"], true);
        assert_eq!(data["source_service"], "offline-template");
        assert_eq!(data["target_language"], "en");
        assert!(
            data["adapted_message"]
                .as_str()
                .unwrap()
                .contains("Take your medication daily")
        );
    }

    #[tokio::test]
    async fn generate_without_backends_serves_offline_text() {
        let (status, body) = send(
            app(vec![]),
            post_json(
                GENERATE_PATH,
                json!({"message": "Take your medication daily", "context": "tagalog-rural"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        assert_eq!(body["data"]["degraded"], true);
        assert_eq!(body["data"]["source_service"], "offline-template");
    }

    #[tokio::test]
    async fn extract_pdf_defaults_context() {
        let primary = Arc::new(MockLlm::new("SEA-Lion", MockReply::text("**DOCUMENT SUMMARY**\nRest.")));
        let (status, body) = send(
            app(vec![primary]),
            multipart(&[("pdf", Some("discharge.pdf"), b"%PDF-1.4 fake".as_slice())]),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        assert_eq!(body["data"]["culturalContext"], "thai-low-literacy");
        assert_eq!(body["data"]["outputLanguage"], "th");
    }

    #[tokio::test]
    async fn contexts_lists_all() {
        let (status, body) = send(
            app(vec![]),
            Request::get("/api/cultural-adaptation/contexts").body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["contexts"].as_array().unwrap().len(), 5);
        assert_eq!(body["data"]["languages"].as_array().unwrap().len(), 6);
        assert_eq!(body["data"]["contexts"][0]["id"], "tagalog-rural");
    }

    #[tokio::test]
    async fn health_reports_each_backend() {
        let primary = Arc::new(MockLlm::new("SEA-Lion", MockReply::text("x")).with_health(false));
        let secondary = Arc::new(MockLlm::new("Gemini", MockReply::text("x")));
        let (status, body) = send(
            app(vec![primary, secondary]),
            Request::get("/api/health").body(Body::empty()).unwrap(),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        let ai = &body["ai_services"];
        assert_eq!(ai["primary_available"], false);
        assert_eq!(ai["secondary_available"], true);
        assert_eq!(ai["primary_service"], "Gemini");
    }

    #[tokio::test]
    async fn extract_pdf_summarizes_upload() {
        let primary = Arc::new(MockLlm::new(
            "SEA-Lion",
            MockReply::text("**DOCUMENT SUMMARY**\nTreated for an infection.\n**MEDICATIONS**\n- Amoxicillin 3x daily"),
        ));
        let (status, body) = send(
            app(vec![primary]),
            multipart(&[
                ("pdf", Some("discharge.pdf"), b"%PDF-1.4 fake".as_slice()),
                ("context", None, b"tagalog-rural".as_slice()),
            ]),
        )
        .await;

        assert_eq!(status, StatusCode::OK, "{body}");
        let data = &body["data"];
        assert_eq!(data["fileName"], "discharge.pdf");
        assert_eq!(data["outputLanguage"], "tl");
        assert_eq!(data["analysisSource"], "SEA-Lion");
        assert_eq!(data["summary"][0]["title"], "DOCUMENT SUMMARY");
        assert_eq!(data["summary"][1]["title"], "MEDICATIONS");
    }

    #[tokio::test]
    async fn extract_pdf_rejects_non_pdf() {
        let primary = Arc::new(MockLlm::new("SEA-Lion", MockReply::text("unused")));
        let (status, body) = send(
            app(vec![Arc::clone(&primary)]),
            multipart(&[("pdf", Some("photo.jpg"), b"\xFF\xD8\xFF\xE0".as_slice())]),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);

        let (status, _) = send(app(vec![Arc::clone(&primary)]), multipart(&[])).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(primary.call_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn extract_pdf_reports_backend_failures() {
        let primary = Arc::new(MockLlm::new("SEA-Lion", MockReply::Fail(FailureKind::RateLimited)));
        let (status, body) = send(
            app(vec![primary]),
            multipart(&[("pdf", Some("discharge.pdf"), b"%PDF-1.4 fake".as_slice())]),
        )
        .await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        let failures = body["error"]["failures"].as_array().unwrap();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0]["backend"], "SEA-Lion");
        assert_eq!(failures[0]["kind"], "rate_limited");
    }

    #[tokio::test]
    async fn unknown_route_is_json_404() {
        let (status, body) = send(
            app(vec![]),
            Request::get("/nope").body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["success"], false);
    }
}
