use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Additive token accounting for a single backend call or a running total.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt: u64,
    pub completion: u64,
    pub total: u64,
}

impl TokenUsage {
    pub fn new(prompt: u64, completion: u64) -> Self {
        Self {
            prompt,
            completion,
            total: prompt + completion,
        }
    }
}

impl std::ops::Add for TokenUsage {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            prompt: self.prompt + rhs.prompt,
            completion: self.completion + rhs.completion,
            total: self.total + rhs.total,
        }
    }
}

impl std::ops::AddAssign for TokenUsage {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

/// Outcome of a single tool invocation. Every call yields exactly one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    pub success: bool,
    pub output: String,
    pub error: Option<String>,
}

impl ToolResult {
    pub fn success(output: impl Into<String>) -> Self {
        Self {
            success: true,
            output: output.into(),
            error: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            output: String::new(),
            error: Some(error.into()),
        }
    }

    /// Text fed back to the model: output on success, `Error: ...` otherwise.
    pub fn as_model_text(&self) -> String {
        if self.success {
            self.output.clone()
        } else {
            format!(
                "Error: {}",
                self.error.as_deref().unwrap_or("unknown error")
            )
        }
    }
}

/// A single tool call emitted by the backend within an assistant turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    pub call_id: String,
    pub tool_name: String,
    pub arguments: serde_json::Value,
}

/// Role-tagged chat message. The harness appends these strictly in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
    Tool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
    /// Set only on `Tool` messages: the `call_id` of the call this answers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }

    pub fn assistant(content: impl Into<String>, tool_calls: Vec<ToolCall>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
            tool_calls,
            tool_call_id: None,
        }
    }

    pub fn tool_result(call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Tool,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: Some(call_id.into()),
        }
    }
}

/// Which of the two agents a tool registry or memory file belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentRole {
    Implementer,
    Reviewer,
}

impl AgentRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Implementer => "implementer",
            Self::Reviewer => "reviewer",
        }
    }

    /// File name of this agent's private memory document.
    pub fn memory_file_name(&self) -> &'static str {
        match self {
            Self::Implementer => "IMPLEMENTER_MEMORY.md",
            Self::Reviewer => "REVIEWER_MEMORY.md",
        }
    }
}

impl std::fmt::Display for AgentRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The Reviewer's per-cycle output: a score and next-step instructions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewVerdict {
    pub score: u8,
    pub next_instructions: String,
    pub is_complete: bool,
    /// Best-effort parsed `git add`/`git commit -m "..."` instructions, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commit_instructions: Option<String>,
    #[serde(default)]
    pub remaining_work: Vec<String>,
    pub raw_content: String,
}

impl ReviewVerdict {
    /// `is_complete` per spec.md §4.6: threshold crossed AND a hard floor of 95,
    /// so a miscalibrated `completion_threshold` cannot declare premature completion.
    pub fn completion_from_score(score: u8, completion_threshold: u8) -> bool {
        score >= completion_threshold && score >= 95
    }
}

/// Coarse-grained session stage. Monotonic: once `Testing`, never reverts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Implementation,
    Testing,
}

impl Default for Phase {
    fn default() -> Self {
        Self::Implementation
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Implementation => write!(f, "implementation"),
            Self::Testing => write!(f, "testing"),
        }
    }
}

/// Append-only record of one completed cycle. Never mutated after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CycleRecord {
    #[serde(rename = "cycle")]
    pub cycle_number: u32,
    pub score: u8,
    pub phase: Phase,
    pub timestamp: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_usage_add_is_componentwise() {
        let a = TokenUsage::new(10, 20);
        let b = TokenUsage::new(1, 2);
        let sum = a + b;
        assert_eq!(sum.prompt, 11);
        assert_eq!(sum.completion, 22);
        assert_eq!(sum.total, 33);
    }

    #[test]
    fn tool_result_as_model_text_reports_error() {
        let failure = ToolResult::failure("boom");
        assert_eq!(failure.as_model_text(), "Error: boom");
        let success = ToolResult::success("ok");
        assert_eq!(success.as_model_text(), "ok");
    }

    #[test]
    fn completion_requires_hard_floor_of_95() {
        // Misconfigured threshold below 95 cannot declare completion early.
        assert!(!ReviewVerdict::completion_from_score(90, 80));
        assert!(ReviewVerdict::completion_from_score(95, 80));
        assert!(ReviewVerdict::completion_from_score(100, 95));
    }

    #[test]
    fn phase_default_is_implementation() {
        assert_eq!(Phase::default(), Phase::Implementation);
    }

    #[test]
    fn agent_role_memory_files_are_distinct() {
        assert_ne!(
            AgentRole::Implementer.memory_file_name(),
            AgentRole::Reviewer.memory_file_name()
        );
    }
}
