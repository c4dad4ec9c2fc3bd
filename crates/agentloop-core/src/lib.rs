//! Shared types and error taxonomy for the two-agent coding orchestrator.

pub mod error;
pub mod types;

pub use error::AppError;
pub use types::{
    AgentRole, CycleRecord, Message, MessageRole, Phase, ReviewVerdict, ToolCall, ToolResult,
    TokenUsage,
};
