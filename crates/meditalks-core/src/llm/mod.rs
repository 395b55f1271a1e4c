//! LLM backend trait, failure taxonomy, and the provider clients.

pub mod gemini;
pub mod mock;
pub mod sealion;

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

pub use gemini::Gemini;
pub use mock::{MockLlm, MockReply};
pub use sealion::SeaLion;

/// Why a single backend call failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    AuthError,
    RateLimited,
    Timeout,
    Unreachable,
    MalformedResponse,
}

impl FailureKind {
    /// Transient kinds the orchestrator retries once.
    pub fn is_retryable(self) -> bool {
        matches!(self, FailureKind::Timeout | FailureKind::Unreachable)
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FailureKind::AuthError => "auth error",
            FailureKind::RateLimited => "rate limited",
            FailureKind::Timeout => "timeout",
            FailureKind::Unreachable => "unreachable",
            FailureKind::MalformedResponse => "malformed response",
        };
        f.write_str(s)
    }
}

/// A failed backend call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{kind}: {message}")]
pub struct BackendFailure {
    pub kind: FailureKind,
    pub message: String,
    /// Parsed `Retry-After`, only for [`FailureKind::RateLimited`].
    pub retry_after: Option<Duration>,
}

impl BackendFailure {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            retry_after: None,
        }
    }

    pub fn rate_limited(retry_after: Option<Duration>) -> Self {
        let message = match retry_after {
            Some(d) => format!("HTTP 429, retry after {:.1}s", d.as_secs_f64()),
            None => "HTTP 429".to_string(),
        };
        Self {
            kind: FailureKind::RateLimited,
            message,
            retry_after,
        }
    }

    pub fn timeout(after: Duration) -> Self {
        Self::new(
            FailureKind::Timeout,
            format!("no response within {:.1}s", after.as_secs_f64()),
        )
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::new(FailureKind::MalformedResponse, message)
    }
}

/// Boxed future returned by [`AiBackend`] methods.
pub type BackendFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A text-generation provider.
///
/// Implementations make exactly one request per call and never retry;
/// retry and fallback belong to the [`Orchestrator`](crate::orchestrator::Orchestrator).
pub trait AiBackend: Send + Sync {
    /// Identifier reported as the serving source (e.g. "SEA-Lion", "Gemini").
    fn name(&self) -> &str;

    /// Send `prompt` and return the completion text.
    fn invoke<'a>(
        &'a self,
        prompt: &'a str,
        client: &'a reqwest::Client,
        timeout: Duration,
    ) -> BackendFuture<'a, Result<String, BackendFailure>>;

    /// Cheap reachability check for health reporting.
    fn check_health<'a>(&'a self, client: &'a reqwest::Client, timeout: Duration) -> BackendFuture<'a, bool>;
}

/// Map a non-success HTTP status to a failure. `Ok(())` for 2xx.
pub fn check_status(resp: &reqwest::Response) -> Result<(), BackendFailure> {
    let status = resp.status();
    if status.is_success() {
        return Ok(());
    }
    match status.as_u16() {
        401 | 403 => Err(BackendFailure::new(
            FailureKind::AuthError,
            format!("HTTP {status}"),
        )),
        429 => {
            let retry_after = resp
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(parse_retry_after);
            Err(BackendFailure::rate_limited(retry_after))
        }
        _ if status.is_server_error() => Err(BackendFailure::new(
            FailureKind::Unreachable,
            format!("HTTP {status}"),
        )),
        _ => Err(BackendFailure::malformed(format!("HTTP {status}"))),
    }
}

/// Map a transport-level reqwest error to a failure.
pub fn classify_transport_error(err: &reqwest::Error, timeout: Duration) -> BackendFailure {
    if err.is_timeout() {
        BackendFailure::timeout(timeout)
    } else if err.is_decode() || err.is_body() {
        BackendFailure::malformed(err.to_string())
    } else {
        BackendFailure::new(FailureKind::Unreachable, err.to_string())
    }
}

/// Parse a Retry-After header value (seconds or HTTP-date).
pub fn parse_retry_after(value: &str) -> Option<Duration> {
    retry_after_at(value, Utc::now())
}

/// Wait until the Retry-After instant as seen from `now`. Past dates mean no wait.
fn retry_after_at(value: &str, now: DateTime<Utc>) -> Option<Duration> {
    let value = value.trim();
    if let Ok(secs) = value.parse::<u64>() {
        return Some(Duration::from_secs(secs));
    }
    let at = DateTime::parse_from_rfc2822(value).ok()?;
    Some((at.with_timezone(&Utc) - now).to_std().unwrap_or(Duration::ZERO))
}

/// Trim a completion and reject it if nothing is left.
pub(crate) fn non_empty_completion(text: Option<&str>) -> Result<String, BackendFailure> {
    match text.map(str::trim) {
        Some(t) if !t.is_empty() => Ok(t.to_string()),
        _ => Err(BackendFailure::malformed("empty completion")),
    }
}

pub(crate) fn trim_base_url(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}
