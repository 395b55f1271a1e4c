//! Scripted backend for tests and offline runs.

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use super::{AiBackend, BackendFailure, BackendFuture, FailureKind};

/// One scripted outcome for [`MockLlm`].
#[derive(Clone, Debug)]
pub enum MockReply {
    /// Return this completion text.
    Text(String),
    /// Fail with this kind.
    Fail(FailureKind),
    /// Sleep past any reasonable timeout.
    Hang,
}

impl MockReply {
    pub fn text(s: impl Into<String>) -> Self {
        MockReply::Text(s.into())
    }
}

/// A hand-rolled [`AiBackend`] that replays scripted replies.
///
/// Each call pops the next reply; once the script runs out the last reply
/// repeats. Calls are counted and can be delayed.
pub struct MockLlm {
    name: String,
    replies: Mutex<Vec<MockReply>>,
    fallback: MockReply,
    delay: Option<Duration>,
    call_count: AtomicUsize,
    prompts: Mutex<Vec<String>>,
    healthy: bool,
}

impl MockLlm {
    /// A mock that always gives `reply`.
    pub fn new(name: impl Into<String>, reply: MockReply) -> Self {
        Self::with_sequence(name, vec![reply])
    }

    /// A mock that gives `replies` in order, then repeats the last one.
    /// An empty script behaves like `Fail(Unreachable)`.
    pub fn with_sequence(name: impl Into<String>, mut replies: Vec<MockReply>) -> Self {
        // Reversed so pop() yields them in order.
        replies.reverse();
        let fallback = replies
            .first()
            .cloned()
            .unwrap_or(MockReply::Fail(FailureKind::Unreachable));
        Self {
            name: name.into(),
            replies: Mutex::new(replies),
            fallback,
            delay: None,
            call_count: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
            healthy: true,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// What [`AiBackend::check_health`] reports.
    pub fn with_health(mut self, healthy: bool) -> Self {
        self.healthy = healthy;
        self
    }

    /// How many times `invoke()` has been called.
    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    /// Prompts received so far, oldest first.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
    }

    fn next_reply(&self) -> MockReply {
        let popped = self.replies.lock().ok().and_then(|mut seq| seq.pop());
        popped.unwrap_or_else(|| self.fallback.clone())
    }
}

impl AiBackend for MockLlm {
    fn name(&self) -> &str {
        &self.name
    }

    fn invoke<'a>(
        &'a self,
        prompt: &'a str,
        _client: &'a reqwest::Client,
        _timeout: Duration,
    ) -> BackendFuture<'a, Result<String, BackendFailure>> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(prompt.to_string());
        }
        let reply = self.next_reply();
        let delay = self.delay;

        Box::pin(async move {
            if let Some(d) = delay {
                tokio::time::sleep(d).await;
            }
            match reply {
                MockReply::Text(text) => Ok(text),
                MockReply::Fail(kind) => Err(BackendFailure::new(kind, format!("scripted {kind}"))),
                MockReply::Hang => {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    Err(BackendFailure::new(FailureKind::Timeout, "scripted hang"))
                }
            }
        })
    }

    fn check_health<'a>(&'a self, _client: &'a reqwest::Client, _timeout: Duration) -> BackendFuture<'a, bool> {
        let healthy = self.healthy;
        Box::pin(async move { healthy })
    }
}
