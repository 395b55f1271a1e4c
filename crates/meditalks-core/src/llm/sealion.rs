//! SEA-Lion client over the OpenAI-compatible chat-completions API.

use std::time::Duration;

use serde_json::json;
use tracing::debug;

use super::{
    AiBackend, BackendFailure, BackendFuture, check_status, classify_transport_error,
    non_empty_completion, trim_base_url,
};

pub const DEFAULT_BASE_URL: &str = "https://api.sealion.ai/v1";
pub const DEFAULT_MODEL: &str = "sealion-7b-instruct";

pub struct SeaLion {
    api_key: String,
    base_url: String,
    model: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl SeaLion {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            max_tokens: 1024,
            temperature: 0.7,
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

impl AiBackend for SeaLion {
    fn name(&self) -> &str {
        "SEA-Lion"
    }

    fn invoke<'a>(
        &'a self,
        prompt: &'a str,
        client: &'a reqwest::Client,
        timeout: Duration,
    ) -> BackendFuture<'a, Result<String, BackendFailure>> {
        Box::pin(async move {
            let url = format!("{}/chat/completions", self.base_url);
            let body = json!({
                "model": self.model,
                "messages": [{ "role": "user", "content": prompt }],
                "max_tokens": self.max_tokens,
                "temperature": self.temperature,
            });
            debug!(%url, prompt_chars = prompt.len(), "SEA-Lion request");

            let resp = client
                .post(&url)
                .bearer_auth(&self.api_key)
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
            non_empty_completion(data["choices"][0]["message"]["content"].as_str())
        })
    }

    fn check_health<'a>(&'a self, client: &'a reqwest::Client, timeout: Duration) -> BackendFuture<'a, bool> {
        Box::pin(async move {
            client
                .get(format!("{}/models", self.base_url))
                .bearer_auth(&self.api_key)
                .timeout(timeout)
                .send()
                .await
                .is_ok_and(|r| r.status().is_success())
        })
    }
}
