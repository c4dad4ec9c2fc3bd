//! The backend port: every model-calling adapter implements this trait and
//! nothing else reaches the harnesses. Synchronous from the harness's point
//! of view in the sense of spec.md §4.4 — one call in, one response out, no
//! streaming contract — even though the trait itself is `async` to fit the
//! ambient `tokio` runtime.

use agentloop_core::{Message, TokenUsage, ToolCall};
use agentloop_tools::schema::ToolSchema;

#[derive(Debug, Clone)]
pub struct GenerateRequest {
    pub messages: Vec<Message>,
    pub tools: Vec<ToolSchema>,
    pub max_tokens: u32,
    pub temperature: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinishReason {
    Stop,
    ToolCalls,
    Error,
}

#[derive(Debug, Clone)]
pub struct GenerateResponse {
    pub content: String,
    pub tool_calls: Vec<ToolCall>,
    pub usage: TokenUsage,
    pub finish_reason: FinishReason,
}

impl GenerateResponse {
    /// Constructs the zero-usage error response mandated by spec.md §4.4:
    /// "On error, content carries a user-facing diagnostic and usage is zero."
    pub fn error(diagnostic: impl Into<String>) -> Self {
        Self {
            content: diagnostic.into(),
            tool_calls: Vec::new(),
            usage: TokenUsage::default(),
            finish_reason: FinishReason::Error,
        }
    }
}

#[async_trait::async_trait]
pub trait Backend: Send + Sync {
    async fn generate(&self, req: GenerateRequest) -> GenerateResponse;

    /// Whether this backend can honor `GenerateRequest.tools`. A harness
    /// talking to a backend that returns `false` gets text-only completions
    /// and must fall back to heuristic parsing.
    fn supports_tools(&self) -> bool;

    /// Short human-readable identity for logs (model name, endpoint, etc).
    fn info(&self) -> String;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_response_has_zero_usage_and_error_reason() {
        let response = GenerateResponse::error("upstream unavailable");
        assert_eq!(response.finish_reason, FinishReason::Error);
        assert_eq!(response.usage, TokenUsage::default());
        assert_eq!(response.content, "upstream unavailable");
        assert!(response.tool_calls.is_empty());
    }
}
