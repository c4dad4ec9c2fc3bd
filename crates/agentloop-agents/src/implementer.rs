//! The Implementer's bounded tool-calling loop. Grounded on `agents.py`'s
//! `Agent1.run`: prompt assembly order, iteration cap, and per-call
//! tool-result bookkeeping all follow it directly.

use std::sync::Arc;

use agentloop_backend::{Backend, FinishReason, GenerateRequest};
use agentloop_core::{Message, TokenUsage, ToolCall, ToolResult};
use agentloop_tools::registry::ToolRegistry;
use agentloop_tools::schema::implementer_schemas;

/// What one Implementer cycle produced: never propagates an error to the
/// controller, per spec.md §4.5 — transport failures surface as an `Error`
/// finish reason and end the loop with whatever content came back.
#[derive(Debug, Clone)]
pub struct AgentResponse {
    pub content: String,
    pub tool_calls_made: Vec<ToolCall>,
    pub tool_results: Vec<ToolResult>,
    pub usage: TokenUsage,
    pub iterations_used: u32,
}

pub struct Implementer {
    backend: Arc<dyn Backend>,
    tools: ToolRegistry,
    system_prompt: String,
    max_iterations: u32,
    max_tokens: u32,
    temperature: f32,
}

impl Implementer {
    pub fn new(
        backend: Arc<dyn Backend>,
        tools: ToolRegistry,
        system_prompt: impl Into<String>,
        max_iterations: u32,
        max_tokens: u32,
        temperature: f32,
    ) -> Self {
        Self {
            backend,
            tools,
            system_prompt: system_prompt.into(),
            max_iterations,
            max_tokens,
            temperature,
        }
    }

    /// Runs one Implementer cycle. `task_summary` is the truncated original
    /// specification, included on every cycle alongside whatever
    /// `instructions` the Reviewer most recently gave.
    pub async fn run(
        &self,
        instructions: &str,
        codebase_context: &str,
        last_commit: Option<&str>,
        task_summary: Option<&str>,
    ) -> AgentResponse {
        let mut messages = vec![Message::system(&self.system_prompt)];
        messages.push(Message::user(
            self.build_user_turn(instructions, codebase_context, last_commit, task_summary)
                .await,
        ));

        let mut total_usage = TokenUsage::default();
        let mut all_tool_calls = Vec::new();
        let mut all_tool_results = Vec::new();
        let mut final_content = String::new();
        let mut iterations_used = 0;

        let tool_schemas = if self.backend.supports_tools() {
            implementer_schemas()
        } else {
            Vec::new()
        };

        for iteration in 0..self.max_iterations {
            iterations_used = iteration + 1;

            let response = self
                .backend
                .generate(GenerateRequest {
                    messages: messages.clone(),
                    tools: tool_schemas.clone(),
                    max_tokens: self.max_tokens,
                    temperature: self.temperature,
                })
                .await;

            total_usage += response.usage;

            if response.tool_calls.is_empty() {
                final_content = response.content;
                break;
            }

            messages.push(Message::assistant(&response.content, response.tool_calls.clone()));

            for call in &response.tool_calls {
                let result = self.tools.execute(call).await;
                if !result.success {
                    tracing::warn!(
                        tool = %call.tool_name,
                        error = result.error.as_deref().unwrap_or("unknown"),
                        "implementer tool call failed"
                    );
                }
                messages.push(Message::tool_result(&call.call_id, result.as_model_text()));
                all_tool_calls.push(call.clone());
                all_tool_results.push(result);
            }

            if response.finish_reason == FinishReason::Stop {
                final_content = response.content;
                break;
            }
        }

        if iterations_used == self.max_iterations {
            tracing::debug!(max_iterations = self.max_iterations, "implementer hit its iteration cap");
        }

        AgentResponse {
            content: final_content,
            tool_calls_made: all_tool_calls,
            tool_results: all_tool_results,
            usage: total_usage,
            iterations_used,
        }
    }

    async fn build_user_turn(
        &self,
        instructions: &str,
        codebase_context: &str,
        last_commit: Option<&str>,
        task_summary: Option<&str>,
    ) -> String {
        let memory_call = ToolCall {
            call_id: "memory_read_init".to_string(),
            tool_name: "memory_read".to_string(),
            arguments: serde_json::json!({}),
        };
        let memory_result = self.tools.execute(&memory_call).await;
        let memory = memory_result.success.then_some(memory_result.output);

        let mut user_content = String::new();
        if let Some(memory_content) = memory {
            user_content.push_str("## YOUR MEMORY (Implementer)\n");
            user_content.push_str(&memory_content);
            user_content.push_str("\n\n");
        }

        user_content.push_str("## CODEBASE SNAPSHOT\n");
        user_content.push_str(codebase_context);
        user_content.push_str("\n\n");

        if let Some(commit) = last_commit {
            if !commit.is_empty() {
                user_content.push_str("## LAST COMMIT\n");
                user_content.push_str(commit);
                user_content.push_str("\n\n");
            }
        }

        if let Some(summary) = task_summary {
            if !summary.is_empty() {
                user_content.push_str("## TASK CONTEXT\n");
                user_content.push_str(summary);
                user_content.push_str("\n\n");
            }
        }

        user_content.push_str("## INSTRUCTIONS\n");
        user_content.push_str(instructions);
        user_content
            .push_str("\n\nExecute these instructions now. Use the available tools to implement the required changes.\n");

        user_content
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentloop_backend::mock::{text_response, MockBackend};
    use agentloop_core::AgentRole;
    use tempfile::TempDir;

    fn implementer(dir: &TempDir, backend: MockBackend) -> Implementer {
        let tools = ToolRegistry::new(dir.path(), AgentRole::Implementer, None).unwrap();
        Implementer::new(Arc::new(backend), tools, "You are the Implementer.", 20, 4096, 0.7)
    }

    #[tokio::test]
    async fn exits_immediately_when_no_tool_calls_returned() {
        let dir = TempDir::new().unwrap();
        let backend = MockBackend::new(vec![text_response("all done")]);
        let agent = implementer(&dir, backend);

        let response = agent.run("do the thing", "tree", None, Some("spec")).await;
        assert_eq!(response.content, "all done");
        assert_eq!(response.iterations_used, 1);
        assert!(response.tool_calls_made.is_empty());
    }

    #[tokio::test]
    async fn executes_tool_calls_then_continues_loop() {
        let dir = TempDir::new().unwrap();
        let tool_response = agentloop_backend::port::GenerateResponse {
            content: String::new(),
            tool_calls: vec![ToolCall {
                call_id: "1".to_string(),
                tool_name: "write".to_string(),
                arguments: serde_json::json!({"path": "a.txt", "content": "hi"}),
            }],
            usage: TokenUsage::new(5, 5),
            finish_reason: FinishReason::ToolCalls,
        };
        let backend = MockBackend::new(vec![tool_response, text_response("finished")]);
        let agent = implementer(&dir, backend);

        let response = agent.run("write a.txt", "tree", None, None).await;
        assert_eq!(response.content, "finished");
        assert_eq!(response.tool_calls_made.len(), 1);
        assert!(dir.path().join("a.txt").exists());
    }

    #[tokio::test]
    async fn stops_at_iteration_cap() {
        let dir = TempDir::new().unwrap();
        let looping_call = || agentloop_backend::port::GenerateResponse {
            content: String::new(),
            tool_calls: vec![ToolCall {
                call_id: "1".to_string(),
                tool_name: "vcs_status".to_string(),
                arguments: serde_json::json!({}),
            }],
            usage: TokenUsage::new(1, 1),
            finish_reason: FinishReason::ToolCalls,
        };
        let responses: Vec<_> = (0..5).map(|_| looping_call()).collect();
        let backend = MockBackend::new(responses);
        let tools = ToolRegistry::new(dir.path(), AgentRole::Implementer, None).unwrap();
        let agent = Implementer::new(Arc::new(backend), tools, "sys", 3, 4096, 0.7);

        let response = agent.run("loop forever", "tree", None, None).await;
        assert_eq!(response.iterations_used, 3);
    }
}
