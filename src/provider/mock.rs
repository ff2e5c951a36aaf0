//! Mock provider for testing
//!
//! Returns configurable responses without making real API calls.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::Result;
use async_trait::async_trait;
use parking_lot::Mutex;

use super::{InvocationRequest, InvocationResponse, Provider, TokenUsage};

/// Mock provider that returns predefined responses
///
/// Response lookup order: per-task response, then the FIFO queue, then the
/// default. Failures injected with [`MockProvider::fail_on_task`] win over
/// all of them.
pub struct MockProvider {
    /// Queue of responses (FIFO)
    responses: Mutex<VecDeque<String>>,
    /// Fixed response per task id
    by_task: Mutex<HashMap<String, String>>,
    /// Task ids whose invocation fails, with the error text
    failures: Mutex<HashMap<String, String>>,
    /// Response when nothing else matches
    default_response: String,
    /// Every request received (for assertions)
    requests: Mutex<Vec<InvocationRequest>>,
    calls: AtomicUsize,
}

impl MockProvider {
    pub fn new() -> Self {
        Self::with_responses(Vec::new())
    }

    /// Create with a queue of responses
    pub fn with_responses(responses: Vec<String>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            by_task: Mutex::new(HashMap::new()),
            failures: Mutex::new(HashMap::new()),
            default_response: "Mock response".to_string(),
            requests: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_default(mut self, response: impl Into<String>) -> Self {
        self.default_response = response.into();
        self
    }

    pub fn queue_response(&self, response: impl Into<String>) {
        self.responses.lock().push_back(response.into());
    }

    /// Always answer `response` for `task_id`
    pub fn respond_to(&self, task_id: impl Into<String>, response: impl Into<String>) {
        self.by_task.lock().insert(task_id.into(), response.into());
    }

    /// Make the invocation for `task_id` fail with `error`
    pub fn fail_on_task(&self, task_id: impl Into<String>, error: impl Into<String>) {
        self.failures.lock().insert(task_id.into(), error.into());
    }

    /// Number of invocations (failed ones included)
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<InvocationRequest> {
        self.requests.lock().clone()
    }

    pub fn last_request(&self) -> Option<InvocationRequest> {
        self.requests.lock().last().cloned()
    }

    /// Task ids in invocation order
    pub fn invoked_tasks(&self) -> Vec<String> {
        self.requests
            .lock()
            .iter()
            .map(|r| r.task_id.to_string())
            .collect()
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Provider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    async fn invoke(&self, request: InvocationRequest) -> Result<InvocationResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().push(request.clone());

        if let Some(error) = self.failures.lock().get(request.task_id.as_ref()) {
            anyhow::bail!("{}", error);
        }

        let by_task = self.by_task.lock().get(request.task_id.as_ref()).cloned();
        let content = match by_task {
            Some(content) => content,
            None => self
                .responses
                .lock()
                .pop_front()
                .unwrap_or_else(|| self.default_response.clone()),
        };

        let usage = TokenUsage::estimate(request.prompt_len(), content.chars().count());
        Ok(InvocationResponse::new(content)
            .with_usage(usage)
            .with_stop_reason("stop"))
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::request;
    use super::*;

    #[tokio::test]
    async fn default_response() {
        let provider = MockProvider::new();
        let response = provider.invoke(request("t")).await.unwrap();
        assert_eq!(response.content, "Mock response");
        assert!(response.usage.total_tokens > 0);
    }

    #[tokio::test]
    async fn queued_then_default() {
        let provider = MockProvider::with_responses(vec!["first".into(), "second".into()])
            .with_default("fallback");
        let mut out = Vec::new();
        for _ in 0..3 {
            out.push(provider.invoke(request("t")).await.unwrap().content);
        }
        assert_eq!(out, vec!["first", "second", "fallback"]);
    }

    #[tokio::test]
    async fn per_task_response_wins_over_queue() {
        let provider = MockProvider::with_responses(vec!["queued".into()]);
        provider.respond_to("script", "fixed");
        assert_eq!(provider.invoke(request("script")).await.unwrap().content, "fixed");
        assert_eq!(provider.invoke(request("other")).await.unwrap().content, "queued");
    }

    #[tokio::test]
    async fn injected_failure_is_counted_and_recorded() {
        let provider = MockProvider::new();
        provider.fail_on_task("review", "quota exceeded");
        let err = provider.invoke(request("review")).await.unwrap_err();
        assert_eq!(err.to_string(), "quota exceeded");
        assert_eq!(provider.call_count(), 1);
        assert_eq!(provider.invoked_tasks(), vec!["review"]);
    }
}
