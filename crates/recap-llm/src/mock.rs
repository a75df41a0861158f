use async_trait::async_trait;
use parking_lot::RwLock;
use std::sync::Arc;

use recap_core::{BackendError, GenerationBackend};

/// Mock generation backend for testing
#[derive(Clone)]
pub struct MockBackend {
    name: String,
    inner: Arc<RwLock<MockBackendInner>>,
}

struct MockBackendInner {
    responses: Vec<String>,
    response_index: usize,
    cycle_responses: bool,
    call_history: Vec<MockCall>,
    should_error: bool,
    error_message: String,
    latency_ms: u64,
}

#[derive(Debug, Clone)]
pub struct MockCall {
    pub system_instruction: String,
    pub prompt: String,
    pub timestamp: std::time::Instant,
}

impl MockBackend {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            inner: Arc::new(RwLock::new(MockBackendInner {
                responses: Vec::new(),
                response_index: 0,
                cycle_responses: false,
                call_history: Vec::new(),
                should_error: false,
                error_message: "Mock error".to_string(),
                latency_ms: 0,
            })),
        }
    }

    /// Backend that always answers with `response`.
    pub fn with_response(response: impl Into<String>) -> Self {
        let mock = Self::default();
        mock.set_response(response);
        mock
    }

    /// Backend that always fails with `error_message`.
    pub fn failing(error_message: impl Into<String>) -> Self {
        let mock = Self::default();
        mock.set_error(error_message);
        mock
    }

    pub fn set_response(&self, response: impl Into<String>) {
        let mut inner = self.inner.write();
        inner.responses = vec![response.into()];
        inner.response_index = 0;
    }

    /// Responses are handed out in order; the last one repeats unless `cycle` is set.
    pub fn set_responses(&self, responses: Vec<String>, cycle: bool) {
        let mut inner = self.inner.write();
        inner.responses = responses;
        inner.response_index = 0;
        inner.cycle_responses = cycle;
    }

    pub fn set_error(&self, error_message: impl Into<String>) {
        let mut inner = self.inner.write();
        inner.should_error = true;
        inner.error_message = error_message.into();
    }

    pub fn clear_error(&self) {
        self.inner.write().should_error = false;
    }

    pub fn set_latency(&self, latency_ms: u64) {
        self.inner.write().latency_ms = latency_ms;
    }

    pub fn call_count(&self) -> usize {
        self.inner.read().call_history.len()
    }

    pub fn call_history(&self) -> Vec<MockCall> {
        self.inner.read().call_history.clone()
    }

    pub fn last_call(&self) -> Option<MockCall> {
        self.inner.read().call_history.last().cloned()
    }

    pub fn clear_history(&self) {
        self.inner.write().call_history.clear();
    }

    pub fn reset(&self) {
        let mut inner = self.inner.write();
        inner.responses.clear();
        inner.response_index = 0;
        inner.cycle_responses = false;
        inner.call_history.clear();
        inner.should_error = false;
        inner.error_message = "Mock error".to_string();
        inner.latency_ms = 0;
    }

    fn next_response(&self) -> String {
        let mut inner = self.inner.write();

        if inner.responses.is_empty() {
            return "Mock summary".to_string();
        }

        let response = inner.responses[inner.response_index].clone();
        if inner.cycle_responses {
            inner.response_index = (inner.response_index + 1) % inner.responses.len();
        } else if inner.response_index < inner.responses.len() - 1 {
            inner.response_index += 1;
        }
        response
    }

    fn record_call(&self, system_instruction: &str, prompt: &str) {
        self.inner.write().call_history.push(MockCall {
            system_instruction: system_instruction.to_string(),
            prompt: prompt.to_string(),
            timestamp: std::time::Instant::now(),
        });
    }

    /// Simulate latency if configured
    async fn simulate_latency(&self) {
        let latency_ms = self.inner.read().latency_ms;
        if latency_ms > 0 {
            tokio::time::sleep(tokio::time::Duration::from_millis(latency_ms)).await;
        }
    }
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new("mock")
    }
}

#[async_trait]
impl GenerationBackend for MockBackend {
    async fn generate(
        &self,
        system_instruction: &str,
        prompt: &str,
    ) -> Result<String, BackendError> {
        self.record_call(system_instruction, prompt);
        self.simulate_latency().await;

        let should_error = self.inner.read().should_error;
        if should_error {
            let error_message = self.inner.read().error_message.clone();
            return Err(BackendError::Transport(error_message));
        }

        Ok(self.next_response())
    }

    fn backend_name(&self) -> &str {
        &self.name
    }
}
