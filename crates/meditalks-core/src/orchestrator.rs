use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::Config;
use crate::llm::{AiBackend, BackendFailure, FailureKind, Gemini, SeaLion};

/// Upper bound on retries per backend.
pub const MAX_RETRIES: u32 = 1;

/// How a single backend is retried before falling back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Extra attempts after the first, only for transient failures.
    /// Capped at [`MAX_RETRIES`].
    pub max_retries: u32,
    /// Pause before each retry.
    pub retry_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: MAX_RETRIES,
            retry_delay: Duration::from_millis(500),
        }
    }
}

/// Record of one backend invocation.
#[derive(Debug, Clone)]
pub struct Attempt {
    pub backend: String,
    pub elapsed: Duration,
    /// `None` on success.
    pub failure: Option<FailureKind>,
}

/// A successful orchestration.
#[derive(Debug, Clone)]
pub struct Completion {
    pub text: String,
    /// Name of the backend that produced `text`.
    pub source: String,
    /// Served by a backend other than the first in the list.
    pub fallback_occurred: bool,
    pub attempts: Vec<Attempt>,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OrchestrationError {
    #[error("all AI backends failed: {}", describe_failures(.failures))]
    AllFailed {
        failures: Vec<(String, BackendFailure)>,
    },
    #[error("no AI backends configured")]
    NoBackends,
    #[error("request cancelled")]
    Cancelled,
}

impl OrchestrationError {
    /// `(backend, kind)` for each failed backend, in try order.
    pub fn failure_kinds(&self) -> Vec<(&str, FailureKind)> {
        match self {
            OrchestrationError::AllFailed { failures } => failures
                .iter()
                .map(|(name, f)| (name.as_str(), f.kind))
                .collect(),
            _ => Vec::new(),
        }
    }
}

fn describe_failures(failures: &[(String, BackendFailure)]) -> String {
    failures
        .iter()
        .map(|(name, f)| format!("{name} ({f})"))
        .collect::<Vec<_>>()
        .join(", ")
}

enum Stop {
    Failed(BackendFailure),
    Cancelled,
}

/// Runs a prompt against an ordered list of backends.
///
/// Each backend gets one attempt plus up to `max_retries` retries on
/// `Timeout`/`Unreachable`. The first success wins. A backend that answers
/// `AuthError` is latched off for the life of this orchestrator and is not
/// invoked again.
pub struct Orchestrator {
    backends: Vec<Arc<dyn AiBackend>>,
    auth_rejected: Vec<AtomicBool>,
    policy: RetryPolicy,
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field(
                "backends",
                &self.backends.iter().map(|b| b.name()).collect::<Vec<_>>(),
            )
            .field("policy", &self.policy)
            .finish()
    }
}

impl Orchestrator {
    pub fn new(backends: Vec<Arc<dyn AiBackend>>) -> Self {
        let auth_rejected = backends.iter().map(|_| AtomicBool::new(false)).collect();
        Self {
            backends,
            auth_rejected,
            policy: RetryPolicy::default(),
        }
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = RetryPolicy {
            max_retries: policy.max_retries.min(MAX_RETRIES),
            ..policy
        };
        self
    }

    /// Build from config: SEA-Lion first, Gemini second, each only if keyed.
    pub fn from_config(config: &Config) -> Self {
        Self::new(build_backend_list(config)).with_retry_policy(RetryPolicy {
            max_retries: config.max_retries,
            retry_delay: Duration::from_millis(config.retry_delay_ms),
        })
    }

    pub fn backends(&self) -> &[Arc<dyn AiBackend>] {
        &self.backends
    }

    pub fn primary_name(&self) -> Option<&str> {
        self.backends.first().map(|b| b.name())
    }

    /// False once the backend at `index` has rejected its credentials.
    pub fn is_usable(&self, index: usize) -> bool {
        self.auth_rejected
            .get(index)
            .is_some_and(|latch| !latch.load(Ordering::SeqCst))
    }

    /// Try each backend in order until one returns a completion.
    pub async fn execute(
        &self,
        prompt: &str,
        timeout: Duration,
        client: &reqwest::Client,
        cancel: &CancellationToken,
    ) -> Result<Completion, OrchestrationError> {
        if self.backends.is_empty() {
            return Err(OrchestrationError::NoBackends);
        }

        let mut failures = Vec::new();
        let mut attempts = Vec::new();

        for (index, backend) in self.backends.iter().enumerate() {
            let name = backend.name().to_string();

            if !self.is_usable(index) {
                debug!(backend = %name, "skipping backend with rejected credentials");
                failures.push((
                    name,
                    BackendFailure::new(FailureKind::AuthError, "credentials previously rejected"),
                ));
                continue;
            }

            if let Some((prev, failure)) = failures.last() {
                warn!(from = %prev, to = %name, kind = %failure.kind, "falling back");
            }

            match self
                .run_backend(index, backend.as_ref(), prompt, timeout, client, cancel, &mut attempts)
                .await
            {
                Ok(text) => {
                    info!(backend = %name, chars = text.len(), "completion received");
                    return Ok(Completion {
                        text,
                        source: name,
                        fallback_occurred: index > 0,
                        attempts,
                    });
                }
                Err(Stop::Cancelled) => return Err(OrchestrationError::Cancelled),
                Err(Stop::Failed(failure)) => failures.push((name, failure)),
            }
        }

        warn!(failures = %describe_failures(&failures), "all backends failed");
        Err(OrchestrationError::AllFailed { failures })
    }

    #[allow(clippy::too_many_arguments)]
    async fn run_backend(
        &self,
        index: usize,
        backend: &dyn AiBackend,
        prompt: &str,
        timeout: Duration,
        client: &reqwest::Client,
        cancel: &CancellationToken,
        attempts: &mut Vec<Attempt>,
    ) -> Result<String, Stop> {
        let mut retries = 0;
        loop {
            if cancel.is_cancelled() {
                return Err(Stop::Cancelled);
            }

            let start = Instant::now();
            let result = tokio::select! {
                _ = cancel.cancelled() => return Err(Stop::Cancelled),
                r = tokio::time::timeout(timeout, backend.invoke(prompt, client, timeout)) => {
                    r.unwrap_or_else(|_| Err(BackendFailure::timeout(timeout)))
                }
            };
            attempts.push(Attempt {
                backend: backend.name().to_string(),
                elapsed: start.elapsed(),
                failure: result.as_ref().err().map(|f| f.kind),
            });

            let failure = match result {
                Ok(text) => return Ok(text),
                Err(failure) => failure,
            };

            if failure.kind == FailureKind::AuthError {
                warn!(backend = backend.name(), "credentials rejected, disabling backend");
                if let Some(latch) = self.auth_rejected.get(index) {
                    latch.store(true, Ordering::SeqCst);
                }
            }

            if !failure.kind.is_retryable() || retries >= self.policy.max_retries {
                warn!(backend = backend.name(), error = %failure, "backend failed");
                return Err(Stop::Failed(failure));
            }

            retries += 1;
            warn!(
                backend = backend.name(),
                error = %failure,
                retry = retries,
                "transient failure, retrying"
            );
            tokio::select! {
                _ = cancel.cancelled() => return Err(Stop::Cancelled),
                _ = tokio::time::sleep(self.policy.retry_delay) => {}
            }
        }
    }
}

/// Build the ordered backend list from config.
///
/// A backend without an API key is never constructed. Names in
/// `disabled_backends` are skipped (case-insensitive).
pub fn build_backend_list(config: &Config) -> Vec<Arc<dyn AiBackend>> {
    let mut backends: Vec<Arc<dyn AiBackend>> = Vec::new();

    let should_include = |name: &str| -> bool {
        !config
            .disabled_backends
            .iter()
            .any(|d| d.eq_ignore_ascii_case(name))
    };

    if let Some(key) = non_blank(&config.sealion_api_key) {
        if should_include("SEA-Lion") {
            let mut client = SeaLion::new(key);
            if let Some(url) = non_blank(&config.sealion_base_url) {
                client = client.with_base_url(url);
            }
            if let Some(model) = non_blank(&config.sealion_model) {
                client = client.with_model(model);
            }
            backends.push(Arc::new(client));
        }
    }
    if let Some(key) = non_blank(&config.gemini_api_key) {
        if should_include("Gemini") {
            let mut client = Gemini::new(key);
            if let Some(url) = non_blank(&config.gemini_base_url) {
                client = client.with_base_url(url);
            }
            if let Some(model) = non_blank(&config.gemini_model) {
                client = client.with_model(model);
            }
            backends.push(Arc::new(client));
        }
    }

    backends
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{MockLlm, MockReply};

    const TIMEOUT: Duration = Duration::from_secs(30);

    fn orchestrator(backends: &[&Arc<MockLlm>]) -> Orchestrator {
        Orchestrator::new(
            backends
                .iter()
                .map(|b| Arc::clone(*b) as Arc<dyn AiBackend>)
                .collect(),
        )
    }

    fn mock(name: &str, replies: Vec<MockReply>) -> Arc<MockLlm> {
        Arc::new(MockLlm::with_sequence(name, replies))
    }

    async fn run(orch: &Orchestrator) -> Result<Completion, OrchestrationError> {
        orch.execute("prompt", TIMEOUT, &reqwest::Client::new(), &CancellationToken::new())
            .await
    }

    // ── success paths ──

    #[tokio::test(start_paused = true)]
    async fn primary_success_no_fallback() {
        let primary = mock("primary", vec![MockReply::text("hello")]);
        let secondary = mock("secondary", vec![MockReply::text("unused")]);
        let orch = orchestrator(&[&primary, &secondary]);

        let done = run(&orch).await.unwrap();
        assert_eq!(done.text, "hello");
        assert_eq!(done.source, "primary");
        assert!(!done.fallback_occurred);
        assert_eq!(secondary.call_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_then_success_retries_primary() {
        let primary = mock(
            "primary",
            vec![MockReply::Fail(FailureKind::Timeout), MockReply::text("second try")],
        );
        let secondary = mock("secondary", vec![MockReply::text("unused")]);
        let orch = orchestrator(&[&primary, &secondary]);

        let done = run(&orch).await.unwrap();
        assert_eq!(done.text, "second try");
        assert_eq!(done.source, "primary");
        assert!(!done.fallback_occurred);
        assert_eq!(primary.call_count(), 2);
        assert_eq!(secondary.call_count(), 0);
        assert_eq!(done.attempts.len(), 2);
        assert_eq!(done.attempts[0].failure, Some(FailureKind::Timeout));
        assert_eq!(done.attempts[1].failure, None);
    }

    #[tokio::test(start_paused = true)]
    async fn unreachable_is_retried_once() {
        let primary = mock("primary", vec![MockReply::Fail(FailureKind::Unreachable)]);
        let secondary = mock("secondary", vec![MockReply::text("from secondary")]);
        let orch = orchestrator(&[&primary, &secondary]);

        let done = run(&orch).await.unwrap();
        assert_eq!(primary.call_count(), 2);
        assert_eq!(done.source, "secondary");
        assert!(done.fallback_occurred);
    }

    #[tokio::test(start_paused = true)]
    async fn auth_error_falls_back_without_retry() {
        let primary = mock("primary", vec![MockReply::Fail(FailureKind::AuthError)]);
        let secondary = mock("secondary", vec![MockReply::text("fallback text")]);
        let orch = orchestrator(&[&primary, &secondary]);

        let done = run(&orch).await.unwrap();
        assert_eq!(done.text, "fallback text");
        assert_eq!(done.source, "secondary");
        assert!(done.fallback_occurred);
        assert_eq!(primary.call_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn rate_limit_and_malformed_are_not_retried() {
        for kind in [FailureKind::RateLimited, FailureKind::MalformedResponse] {
            let primary = mock("primary", vec![MockReply::Fail(kind)]);
            let secondary = mock("secondary", vec![MockReply::text("ok")]);
            let orch = orchestrator(&[&primary, &secondary]);

            let done = run(&orch).await.unwrap();
            assert_eq!(primary.call_count(), 1, "{kind} should not retry");
            assert!(done.fallback_occurred);
        }
    }

    // ── failure paths ──

    #[tokio::test(start_paused = true)]
    async fn both_fail_reports_both_kinds() {
        let primary = mock("primary", vec![MockReply::Fail(FailureKind::AuthError)]);
        let secondary = mock("secondary", vec![MockReply::Fail(FailureKind::Timeout)]);
        let orch = orchestrator(&[&primary, &secondary]);

        let err = run(&orch).await.unwrap_err();
        assert_eq!(
            err.failure_kinds(),
            vec![("primary", FailureKind::AuthError), ("secondary", FailureKind::Timeout)]
        );
        assert_eq!(secondary.call_count(), 2);
        assert!(err.to_string().starts_with("all AI backends failed: primary (auth error"));
    }

    #[tokio::test]
    async fn empty_list_is_no_backends() {
        let orch = Orchestrator::new(Vec::new());
        assert_eq!(run(&orch).await.unwrap_err(), OrchestrationError::NoBackends);
    }

    #[tokio::test(start_paused = true)]
    async fn hanging_backend_hits_timeout() {
        let primary = mock("primary", vec![MockReply::Hang]);
        let secondary = mock("secondary", vec![MockReply::text("rescued")]);
        let orch = orchestrator(&[&primary, &secondary]);

        let done = run(&orch).await.unwrap();
        assert_eq!(done.source, "secondary");
        assert_eq!(primary.call_count(), 2);
        assert_eq!(done.attempts[0].failure, Some(FailureKind::Timeout));
    }

    // ── auth latch ──

    #[tokio::test(start_paused = true)]
    async fn auth_error_latches_backend_off() {
        let primary = mock(
            "primary",
            vec![MockReply::Fail(FailureKind::AuthError), MockReply::text("never")],
        );
        let secondary = mock("secondary", vec![MockReply::text("ok")]);
        let orch = orchestrator(&[&primary, &secondary]);

        run(&orch).await.unwrap();
        assert!(!orch.is_usable(0));
        let second = run(&orch).await.unwrap();
        assert_eq!(second.source, "secondary");
        assert_eq!(primary.call_count(), 1);
        assert_eq!(secondary.call_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn latched_backends_still_reported_on_total_failure() {
        let primary = mock("primary", vec![MockReply::Fail(FailureKind::AuthError)]);
        let secondary = mock("secondary", vec![MockReply::Fail(FailureKind::RateLimited)]);
        let orch = orchestrator(&[&primary, &secondary]);

        run(&orch).await.unwrap_err();
        let err = run(&orch).await.unwrap_err();
        assert_eq!(
            err.failure_kinds(),
            vec![("primary", FailureKind::AuthError), ("secondary", FailureKind::RateLimited)]
        );
        assert_eq!(primary.call_count(), 1);
    }

    // ── cancellation and determinism ──

    #[tokio::test(start_paused = true)]
    async fn cancelled_token_stops_execution() {
        let primary = mock("primary", vec![MockReply::text("unused")]);
        let orch = orchestrator(&[&primary]);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = orch
            .execute("prompt", TIMEOUT, &reqwest::Client::new(), &cancel)
            .await
            .unwrap_err();
        assert_eq!(err, OrchestrationError::Cancelled);
        assert_eq!(primary.call_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_during_call_aborts() {
        let primary = mock("primary", vec![MockReply::Hang]);
        let orch = orchestrator(&[&primary]);
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            trigger.cancel();
        });

        let err = orch
            .execute("prompt", TIMEOUT, &reqwest::Client::new(), &cancel)
            .await
            .unwrap_err();
        assert_eq!(err, OrchestrationError::Cancelled);
    }

    #[tokio::test(start_paused = true)]
    async fn same_outcomes_same_serving_backend() {
        let script = || {
            (
                mock("primary", vec![MockReply::Fail(FailureKind::Unreachable)]),
                mock("secondary", vec![MockReply::Fail(FailureKind::Timeout), MockReply::text("x")]),
            )
        };
        let (p1, s1) = script();
        let (p2, s2) = script();
        let a = run(&orchestrator(&[&p1, &s1])).await.unwrap();
        let b = run(&orchestrator(&[&p2, &s2])).await.unwrap();
        assert_eq!(a.source, b.source);
        assert_eq!(a.attempts.len(), b.attempts.len());
    }

    #[tokio::test(start_paused = true)]
    async fn three_backends_fall_through_in_order() {
        let a = mock("a", vec![MockReply::Fail(FailureKind::MalformedResponse)]);
        let b = mock("b", vec![MockReply::Fail(FailureKind::AuthError)]);
        let c = mock("c", vec![MockReply::text("third")]);
        let done = run(&orchestrator(&[&a, &b, &c])).await.unwrap();
        assert_eq!(done.source, "c");
        assert!(done.fallback_occurred);
    }

    // ── backend list ──

    #[tokio::test(start_paused = true)]
    async fn retry_budget_never_exceeds_one() {
        let primary = Arc::new(MockLlm::new("SEA-Lion", MockReply::Fail(FailureKind::Timeout)));
        let orch = Orchestrator::new(vec![Arc::clone(&primary) as Arc<dyn AiBackend>])
            .with_retry_policy(RetryPolicy {
                max_retries: 4,
                retry_delay: Duration::from_millis(10),
            });
        assert_eq!(orch.policy.max_retries, MAX_RETRIES);

        let err = run(&orch).await.unwrap_err();
        assert_eq!(err.failure_kinds(), [("SEA-Lion", FailureKind::Timeout)]);
        assert_eq!(primary.call_count(), 2);
    }

    #[test]
    fn backend_list_follows_keys() {
        let names = |config: &Config| -> Vec<String> {
            build_backend_list(config)
                .iter()
                .map(|b| b.name().to_string())
                .collect()
        };

        let both = Config {
            sealion_api_key: Some("s".into()),
            gemini_api_key: Some("g".into()),
            ..Config::default()
        };
        assert_eq!(names(&both), ["SEA-Lion", "Gemini"]);

        let gemini_only = Config {
            sealion_api_key: Some("  ".into()),
            gemini_api_key: Some("g".into()),
            ..Config::default()
        };
        assert_eq!(names(&gemini_only), ["Gemini"]);

        let disabled = Config {
            disabled_backends: vec!["sea-lion".into()],
            ..both.clone()
        };
        assert_eq!(names(&disabled), ["Gemini"]);

        assert!(names(&Config::default()).is_empty());
    }
}
