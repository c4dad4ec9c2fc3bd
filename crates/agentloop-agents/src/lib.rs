//! The two agent harnesses: the Implementer's bounded tool-calling loop and
//! the Reviewer's single restricted call. Grounded on `agents.py`'s
//! `Agent1`/`Agent2`.

pub mod implementer;
pub mod review_parser;
pub mod reviewer;

pub use implementer::{AgentResponse, Implementer};
pub use reviewer::Reviewer;
