//! A scriptable backend for harness and orchestrator tests: construct with a
//! queue of responses, `generate` pops one per call, and panics loudly if
//! the queue runs dry so a misconfigured test fails fast rather than hanging.

use std::sync::Mutex;

use crate::port::{Backend, FinishReason, GenerateRequest, GenerateResponse};

pub struct MockBackend {
    queue: Mutex<Vec<GenerateResponse>>,
    calls: Mutex<Vec<GenerateRequest>>,
}

impl MockBackend {
    /// `responses` are popped in order, first call gets `responses[0]`.
    pub fn new(responses: Vec<GenerateResponse>) -> Self {
        let mut queue = responses;
        queue.reverse();
        Self {
            queue: Mutex::new(queue),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().expect("mock backend poisoned").len()
    }

    /// Snapshot of every request received so far, in call order.
    pub fn requests(&self) -> Vec<GenerateRequest> {
        self.calls.lock().expect("mock backend poisoned").clone()
    }
}

#[async_trait::async_trait]
impl Backend for MockBackend {
    async fn generate(&self, req: GenerateRequest) -> GenerateResponse {
        self.calls.lock().expect("mock backend poisoned").push(req);
        let mut queue = self.queue.lock().expect("mock backend poisoned");
        queue.pop().unwrap_or_else(|| {
            tracing::warn!("mock backend response queue exhausted");
            GenerateResponse::error("MockBackend: response queue exhausted")
        })
    }

    fn supports_tools(&self) -> bool {
        true
    }

    fn info(&self) -> String {
        "mock".to_string()
    }
}

/// Convenience constructor for a plain-text `stop` response, the common case
/// in harness tests that don't exercise tool calling.
pub fn text_response(content: impl Into<String>) -> GenerateResponse {
    GenerateResponse {
        content: content.into(),
        tool_calls: Vec::new(),
        usage: agentloop_core::TokenUsage::new(10, 10),
        finish_reason: FinishReason::Stop,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn pops_responses_in_order() {
        let backend = MockBackend::new(vec![text_response("first"), text_response("second")]);
        let req = GenerateRequest {
            messages: Vec::new(),
            tools: Vec::new(),
            max_tokens: 100,
            temperature: 0.0,
        };
        let first = backend.generate(req.clone()).await;
        let second = backend.generate(req).await;
        assert_eq!(first.content, "first");
        assert_eq!(second.content, "second");
        assert_eq!(backend.call_count(), 2);
    }

    #[tokio::test]
    async fn exhausted_queue_returns_error_response() {
        let backend = MockBackend::new(vec![]);
        let req = GenerateRequest {
            messages: Vec::new(),
            tools: Vec::new(),
            max_tokens: 100,
            temperature: 0.0,
        };
        let response = backend.generate(req).await;
        assert_eq!(response.finish_reason, FinishReason::Error);
    }
}
