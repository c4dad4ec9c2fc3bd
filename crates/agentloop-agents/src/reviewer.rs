//! The Reviewer's single restricted backend call. Grounded on `agents.py`'s
//! `Agent2.review`: prompt assembly order, the two-stage submit-then-save
//! dance, and the fallback to heuristic parsing if `submit_review` is never
//! called.

use std::sync::Arc;

use agentloop_backend::{Backend, GenerateRequest};
use agentloop_core::{Message, ReviewVerdict, TokenUsage};
use agentloop_tools::registry::ToolRegistry;
use agentloop_tools::review_sink::ReviewSink;
use agentloop_tools::schema::{reviewer_followup_schemas, reviewer_schemas};

use crate::review_parser::parse_heuristic;

/// The follow-up submit-then-save call after a successful `submit_review`
/// tool execution is a short, fixed-shape request (memory write or nothing);
/// it doesn't need the full configured budget, so it keeps its own
/// independent cap rather than reusing `model.max_tokens`.
const FOLLOWUP_MAX_TOKENS: u32 = 2048;

pub struct Reviewer {
    backend: Arc<dyn Backend>,
    tools: ToolRegistry,
    review_sink: ReviewSink,
    system_prompt: String,
    max_tokens: u32,
    temperature: f32,
}

impl Reviewer {
    pub fn new(
        backend: Arc<dyn Backend>,
        tools: ToolRegistry,
        review_sink: ReviewSink,
        system_prompt: impl Into<String>,
        max_tokens: u32,
        temperature: f32,
    ) -> Self {
        Self {
            backend,
            tools,
            review_sink,
            system_prompt: system_prompt.into(),
            max_tokens,
            temperature,
        }
    }

    /// Reviews the current on-disk state and returns a verdict. `completion_threshold`
    /// is the configured minimum, ANDed with the hard 95 floor per
    /// `ReviewVerdict::completion_from_score`.
    pub async fn review(
        &self,
        original_spec: &str,
        codebase_context: &str,
        git_log: &str,
        completion_threshold: u8,
    ) -> (ReviewVerdict, TokenUsage) {
        let mut messages = vec![Message::system(&self.system_prompt)];
        messages.push(Message::user(
            self.build_user_turn(original_spec, codebase_context, git_log).await,
        ));

        let tool_schemas = if self.backend.supports_tools() {
            reviewer_schemas()
        } else {
            Vec::new()
        };

        let response = self
            .backend
            .generate(GenerateRequest {
                messages: messages.clone(),
                tools: tool_schemas.clone(),
                max_tokens: self.max_tokens,
                temperature: self.temperature,
            })
            .await;

        let mut usage = response.usage;

        let submit_call = response
            .tool_calls
            .iter()
            .find(|call| call.tool_name == "submit_review");

        if let Some(call) = submit_call {
            let result = self.tools.execute(call).await;
            if result.success {
                messages.push(Message::assistant(&response.content, vec![call.clone()]));
                messages.push(Message::tool_result(&call.call_id, result.as_model_text()));

                let follow_up = self
                    .backend
                    .generate(GenerateRequest {
                        messages,
                        tools: reviewer_followup_schemas(),
                        max_tokens: FOLLOWUP_MAX_TOKENS,
                        temperature: self.temperature,
                    })
                    .await;
                usage += follow_up.usage;

                for call in &follow_up.tool_calls {
                    if call.tool_name == "memory_write" {
                        // Malformed follow-up memory writes are dropped
                        // silently, per spec.md §4.6's agents.py lineage.
                        let _ = self.tools.execute(call).await;
                    }
                }
            }
        } else {
            // Other tool calls (e.g. a bare memory_write) still execute so
            // the Reviewer's memory stays current even without a verdict.
            for call in &response.tool_calls {
                if call.tool_name != "submit_review" {
                    let _ = self.tools.execute(call).await;
                }
            }
        }

        let verdict = self.build_verdict(&response.content, completion_threshold);
        (verdict, usage)
    }

    fn build_verdict(&self, raw_content: &str, completion_threshold: u8) -> ReviewVerdict {
        if let Some(submitted) = self.review_sink.take() {
            let is_complete = ReviewVerdict::completion_from_score(submitted.score, completion_threshold);
            return ReviewVerdict {
                score: submitted.score,
                next_instructions: submitted.instructions,
                is_complete,
                commit_instructions: None,
                remaining_work: Vec::new(),
                raw_content: raw_content.to_string(),
            };
        }

        tracing::debug!("reviewer fell back to heuristic parsing; submit_review was never called");
        let parsed = parse_heuristic(raw_content);
        let is_complete = ReviewVerdict::completion_from_score(parsed.score, completion_threshold)
            && parsed.remaining_work.is_empty();
        ReviewVerdict {
            score: parsed.score,
            next_instructions: parsed.next_instructions,
            is_complete,
            commit_instructions: (!parsed.commit_instructions.is_empty())
                .then_some(parsed.commit_instructions),
            remaining_work: parsed.remaining_work,
            raw_content: raw_content.to_string(),
        }
    }

    async fn build_user_turn(&self, original_spec: &str, codebase_context: &str, git_log: &str) -> String {
        let memory_call = agentloop_core::ToolCall {
            call_id: "memory_read_init".to_string(),
            tool_name: "memory_read".to_string(),
            arguments: serde_json::json!({}),
        };
        let memory_result = self.tools.execute(&memory_call).await;

        let mut user_content = String::new();
        if memory_result.success {
            user_content.push_str("## YOUR MEMORY (Reviewer)\n");
            user_content.push_str(&memory_result.output);
            user_content.push_str("\n\n");
        }

        user_content.push_str("## ORIGINAL SPECIFICATION\n");
        user_content.push_str(original_spec);
        user_content.push_str("\n\n## CURRENT CODEBASE\n");
        user_content.push_str(codebase_context);
        user_content.push_str("\n\n## GIT LOG (Recent Commits)\n");
        user_content.push_str(git_log);
        user_content.push_str(
            "\n\nReview the codebase and use submit_review() to provide the Implementer with clear, numbered steps.\n",
        );
        user_content
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentloop_backend::mock::MockBackend;
    use agentloop_backend::port::{FinishReason, GenerateResponse};
    use agentloop_core::{AgentRole, ToolCall};
    use tempfile::TempDir;

    fn reviewer(dir: &TempDir, backend: MockBackend, sink: ReviewSink) -> Reviewer {
        let tools = ToolRegistry::new(dir.path(), AgentRole::Reviewer, Some(sink.clone())).unwrap();
        Reviewer::new(Arc::new(backend), tools, sink, "You are the Reviewer.", 4096, 0.7)
    }

    #[tokio::test]
    async fn prefers_structured_submission_over_heuristic() {
        let dir = TempDir::new().unwrap();
        let sink = ReviewSink::new();
        let submit_call = ToolCall {
            call_id: "1".to_string(),
            tool_name: "submit_review".to_string(),
            arguments: serde_json::json!({"instructions": "do the thing", "score": 97}),
        };
        let first = GenerateResponse {
            content: String::new(),
            tool_calls: vec![submit_call],
            usage: TokenUsage::new(10, 10),
            finish_reason: FinishReason::ToolCalls,
        };
        let follow_up = GenerateResponse {
            content: String::new(),
            tool_calls: Vec::new(),
            usage: TokenUsage::new(2, 2),
            finish_reason: FinishReason::Stop,
        };
        let backend = MockBackend::new(vec![first, follow_up]);
        let agent = reviewer(&dir, backend, sink);

        let (verdict, usage) = agent.review("spec", "tree", "log", 95).await;
        assert_eq!(verdict.score, 97);
        assert_eq!(verdict.next_instructions, "do the thing");
        assert!(verdict.is_complete);
        assert_eq!(usage.prompt, 12);
    }

    #[tokio::test]
    async fn falls_back_to_heuristic_when_submit_review_skipped() {
        let dir = TempDir::new().unwrap();
        let sink = ReviewSink::new();
        let response = GenerateResponse {
            content: "Completeness: 60%\n\nNext Instructions:\nAdd tests".to_string(),
            tool_calls: Vec::new(),
            usage: TokenUsage::new(5, 5),
            finish_reason: FinishReason::Stop,
        };
        let backend = MockBackend::new(vec![response]);
        let agent = reviewer(&dir, backend, sink);

        let (verdict, _usage) = agent.review("spec", "tree", "log", 95).await;
        assert_eq!(verdict.score, 60);
        assert!(!verdict.is_complete);
        assert!(verdict.next_instructions.contains("Add tests"));
    }

    #[tokio::test]
    async fn high_score_with_remaining_work_is_not_complete() {
        let dir = TempDir::new().unwrap();
        let sink = ReviewSink::new();
        let response = GenerateResponse {
            content: "Completeness: 99%\n\nRemaining Work:\n- polish docs\n\nNext Instructions:\nPolish".to_string(),
            tool_calls: Vec::new(),
            usage: TokenUsage::new(5, 5),
            finish_reason: FinishReason::Stop,
        };
        let backend = MockBackend::new(vec![response]);
        let agent = reviewer(&dir, backend, sink);

        let (verdict, _usage) = agent.review("spec", "tree", "log", 95).await;
        assert_eq!(verdict.score, 99);
        assert!(!verdict.is_complete);
    }
}
