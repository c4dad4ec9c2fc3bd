//! Configuration surface for a loop session: model selection, limits, agent
//! prompts, monitoring, and informational feature flags.

pub mod config;
pub mod prompts;

pub use config::{AgentsConfig, FeaturesConfig, LimitsConfig, LoopConfig, ModelConfig, MonitoringConfig};
pub use prompts::{
    DEFAULT_IMPLEMENTER_PROMPT, DEFAULT_REVIEWER_IMPLEMENTATION_PROMPT,
    DEFAULT_REVIEWER_TESTING_PROMPT,
};
