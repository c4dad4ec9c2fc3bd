//! The fixed tool catalog each agent harness calls through: shell, file
//! operations, VCS, and per-agent memory. One [`ToolRegistry`] per agent per
//! cycle, per the bias-isolation requirement that memory and tool catalogs
//! are partitioned by agent.

pub mod memory;
pub mod registry;
pub mod review_sink;
pub mod schema;

pub use memory::AgentMemory;
pub use registry::ToolRegistry;
pub use review_sink::{ReviewSink, SubmittedReview};
