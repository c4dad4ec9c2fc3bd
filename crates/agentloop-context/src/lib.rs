//! Assembles the codebase snapshot each agent sees: a file tree, a dump of
//! source files, and (for the Reviewer) recent git history.

pub mod assembler;
pub mod file_tree;
pub mod git;
pub mod source_dump;

pub use assembler::{build_implementer_context, build_reviewer_context, ContextSnapshot};
