//! Glues the file tree, source dump, and (for the Reviewer) git history into
//! the two context strings the agent harnesses hand to the backend.

use std::path::Path;

use crate::file_tree::build_file_tree;
use crate::git::{get_git_log, get_last_commit};
use crate::source_dump::{collect_all_blocks, estimate_tokens, read_focus_files};

const MAX_TREE_DEPTH: u32 = 10;
const GIT_LOG_COUNT: u32 = 10;

/// Bookkeeping about a context build, useful for logging but not part of the
/// prompt text itself.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ContextSnapshot {
    pub file_count: usize,
    pub truncated: bool,
    pub estimated_tokens: usize,
}

/// Joins per-file blocks in order until `token_limit` would be exceeded,
/// appending a truncation marker naming how many files were dropped.
/// `token_limit` of 0 means unbounded.
fn truncate_blocks(blocks: Vec<String>, token_limit: usize) -> (String, ContextSnapshot) {
    if token_limit == 0 {
        let joined = blocks.join("\n");
        let tokens = estimate_tokens(&joined);
        return (
            joined,
            ContextSnapshot {
                file_count: blocks.len(),
                truncated: false,
                estimated_tokens: tokens,
            },
        );
    }

    let mut kept = Vec::new();
    let mut running = 0usize;
    let mut cut_off = blocks.len();
    for (i, block) in blocks.iter().enumerate() {
        let block_tokens = estimate_tokens(block);
        if running + block_tokens > token_limit && !kept.is_empty() {
            cut_off = i;
            break;
        }
        running += block_tokens;
        kept.push(block.clone());
    }

    let omitted = blocks.len() - kept.len();
    let truncated = omitted > 0 && cut_off < blocks.len();
    let mut joined = kept.join("\n");
    if truncated {
        joined.push_str(&format!("\n... (truncated, {omitted} files omitted)\n"));
    }

    let tokens = estimate_tokens(&joined);
    (
        joined,
        ContextSnapshot {
            file_count: blocks.len(),
            truncated,
            estimated_tokens: tokens,
        },
    )
}

/// Builds the Implementer's context: file tree plus either the focus files
/// named in `focus_files` or a full source dump, bounded by `token_limit`
/// (0 = unbounded).
pub fn build_implementer_context(
    workspace: &Path,
    focus_files: Option<&[String]>,
    token_limit: usize,
) -> (String, ContextSnapshot) {
    let tree = build_file_tree(workspace, MAX_TREE_DEPTH);

    let (files_str, snapshot) = match focus_files {
        Some(files) if !files.is_empty() => {
            let dump = read_focus_files(workspace, files);
            let tokens = estimate_tokens(&dump);
            (
                dump,
                ContextSnapshot {
                    file_count: files.len(),
                    truncated: false,
                    estimated_tokens: tokens,
                },
            )
        }
        _ => {
            let blocks = collect_all_blocks(workspace);
            truncate_blocks(blocks, token_limit)
        }
    };

    let context = format!("### File Tree\n```\n{tree}\n```\n\n### Source Files\n{files_str}\n");
    (context, snapshot)
}

/// Builds the Reviewer's context: file tree, full source dump (bounded by
/// `token_limit`), and recent git log.
pub async fn build_reviewer_context(
    workspace: &Path,
    token_limit: usize,
) -> (String, ContextSnapshot) {
    let tree = build_file_tree(workspace, MAX_TREE_DEPTH);
    let blocks = collect_all_blocks(workspace);
    let (files_str, snapshot) = truncate_blocks(blocks, token_limit);
    let git_log = get_git_log(workspace, GIT_LOG_COUNT).await;

    let context = format!(
        "### File Tree\n```\n{tree}\n```\n\n### Source Files\n{files_str}\n\n### Git Log\n```\n{git_log}\n```\n"
    );
    (context, snapshot)
}

/// Standalone accessor used by the Implementer harness to show the last
/// commit message alongside its task instructions.
pub async fn last_commit_summary(workspace: &Path) -> String {
    get_last_commit(workspace).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn implementer_context_includes_tree_and_files() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("main.rs"), "fn main() {}").unwrap();
        let (context, snapshot) = build_implementer_context(dir.path(), None, 0);
        assert!(context.contains("File Tree"));
        assert!(context.contains("main.rs"));
        assert_eq!(snapshot.file_count, 1);
        assert!(!snapshot.truncated);
    }

    #[test]
    fn implementer_context_focus_files_skips_full_dump() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.rs"), "a").unwrap();
        std::fs::write(dir.path().join("b.rs"), "b").unwrap();
        let (context, snapshot) =
            build_implementer_context(dir.path(), Some(&["a.rs".to_string()]), 0);
        assert!(context.contains("a.rs"));
        assert!(!context.contains("### b.rs"));
        assert_eq!(snapshot.file_count, 1);
    }

    #[test]
    fn truncate_blocks_keeps_at_least_one_block_even_if_oversized() {
        let huge = "x".repeat(1000);
        let blocks = vec![format!("### a.rs\n```\n{huge}\n```\n")];
        let (joined, snapshot) = truncate_blocks(blocks, 1);
        assert!(joined.contains("a.rs"));
        assert!(!snapshot.truncated);
    }

    #[test]
    fn truncate_blocks_drops_trailing_files_over_budget() {
        let blocks: Vec<String> = (0..20)
            .map(|i| format!("### f{i}.rs\n```\n{}\n```\n", "y".repeat(40)))
            .collect();
        let (joined, snapshot) = truncate_blocks(blocks, 20);
        assert!(snapshot.truncated);
        assert!(joined.contains("files omitted"));
        assert!(!joined.contains("f19.rs"));
    }

    #[tokio::test]
    async fn reviewer_context_includes_git_log_section() {
        let dir = TempDir::new().unwrap();
        let (context, _snapshot) = build_reviewer_context(dir.path(), 0).await;
        assert!(context.contains("Git Log"));
    }
}
