//! Scriptable reasoning backend for tests and offline runs.

use super::{ReasoningBackend, ReasoningError, ReasoningPrompt, ReasoningResult};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;

/// Mock backend answering from a queue of scripted results.
///
/// When the queue is empty the last scripted result is repeated; with nothing
/// scripted at all the backend reports itself unavailable.
pub struct MockReasoningBackend {
    name: String,
    script: Mutex<VecDeque<ReasoningResult<serde_json::Value>>>,
    last: Mutex<Option<ReasoningResult<serde_json::Value>>>,
    prompts: Mutex<Vec<ReasoningPrompt>>,
    calls: AtomicUsize,
    delay: Option<Duration>,
}

impl MockReasoningBackend {
    /// Creates a mock with nothing scripted.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            script: Mutex::new(VecDeque::new()),
            last: Mutex::new(None),
            prompts: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
            delay: None,
        }
    }

    /// Creates a mock that always answers with `payload`.
    pub fn with_response(payload: serde_json::Value) -> Self {
        Self {
            script: Mutex::new(VecDeque::from([Ok(payload)])),
            ..Self::new("mock")
        }
    }

    /// Creates a mock that always fails with `error`.
    pub fn with_error(error: ReasoningError) -> Self {
        Self {
            script: Mutex::new(VecDeque::from([Err(error)])),
            ..Self::new("mock")
        }
    }

    /// Sleeps this long before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Queues a successful answer.
    pub async fn push_response(&self, payload: serde_json::Value) {
        self.script.lock().await.push_back(Ok(payload));
    }

    /// Queues a failure.
    pub async fn push_error(&self, error: ReasoningError) {
        self.script.lock().await.push_back(Err(error));
    }

    /// Number of `complete` calls made so far.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// The most recent prompt received.
    pub async fn last_prompt(&self) -> Option<ReasoningPrompt> {
        self.prompts.lock().await.last().cloned()
    }
}

#[async_trait]
impl ReasoningBackend for MockReasoningBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(&self, prompt: &ReasoningPrompt) -> ReasoningResult<serde_json::Value> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().await.push(prompt.clone());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let next = self.script.lock().await.pop_front();
        let mut last = self.last.lock().await;
        match next {
            Some(result) => {
                *last = Some(result.clone());
                result
            }
            None => last.clone().unwrap_or_else(|| {
                Err(ReasoningError::Unavailable(
                    "no scripted response".to_string(),
                ))
            }),
        }
    }
}
