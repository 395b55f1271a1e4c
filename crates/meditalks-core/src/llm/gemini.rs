//! Google Gemini client over the `generateContent` REST API.

use std::time::Duration;

use serde_json::json;
use tracing::debug;

use super::{
    AiBackend, BackendFailure, BackendFuture, check_status, classify_transport_error,
    non_empty_completion, trim_base_url,
};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";

pub struct Gemini {
    api_key: String,
    base_url: String,
    model: String,
}

impl Gemini {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = trim_base_url(base_url);
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }
}

impl AiBackend for Gemini {
    fn name(&self) -> &str {
        "Gemini"
    }

    fn invoke<'a>(
        &'a self,
        prompt: &'a str,
        client: &'a reqwest::Client,
        timeout: Duration,
    ) -> BackendFuture<'a, Result<String, BackendFailure>> {
        Box::pin(async move {
            let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
            let body = json!({
                "contents": [{ "role": "user", "parts": [{ "text": prompt }] }],
            });
            debug!(%url, prompt_chars = prompt.len(), "Gemini request");

            let resp = client
                .post(&url)
                .header("x-goog-api-key", &self.api_key)
                .json(&body)
                .timeout(timeout)
                .send()
                .await
                .map_err(|e| classify_transport_error(&e, timeout))?;

            check_status(&resp)?;

            let data: serde_json::Value = resp
                .json()
                .await
                .map_err(|e| classify_transport_error(&e, timeout))?;

            // A blocked prompt comes back as 200 with no candidates.
            if let Some(reason) = data["promptFeedback"]["blockReason"].as_str() {
                return Err(BackendFailure::malformed(format!("prompt blocked: {reason}")));
            }
            non_empty_completion(data["candidates"][0]["content"]["parts"][0]["text"].as_str())
        })
    }

    fn check_health<'a>(&'a self, client: &'a reqwest::Client, timeout: Duration) -> BackendFuture<'a, bool> {
        Box::pin(async move {
            client
                .get(format!("{}/models/{}", self.base_url, self.model))
                .header("x-goog-api-key", &self.api_key)
                .timeout(timeout)
                .send()
                .await
                .is_ok_and(|r| r.status().is_success())
        })
    }
}
