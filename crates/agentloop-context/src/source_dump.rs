//! Concatenates source files into fenced `### path` blocks, the format both
//! agents read their codebase snapshot in.

use std::path::Path;

use agentloop_sandbox::PathGuard;

use crate::file_tree::should_ignore;

/// Extensions dumped by default. Mirrors `ContextBuilder.read_all_source_files`.
const DEFAULT_EXTENSIONS: &[&str] = &[
    "py", "js", "ts", "jsx", "tsx", "java", "go", "rs", "c", "cpp", "h", "hpp", "rb", "php",
    "swift", "kt", "scala", "sh", "bash", "zsh", "yaml", "yml", "json", "toml", "ini", "cfg",
    "md", "txt", "html", "css", "scss", "less", "sql", "graphql", "proto",
];

/// Walks `root` recursively and renders every matching file as a
/// ```` ### relative/path\n```\n<contents>\n```\n ```` block, joined by blank
/// lines. Skips anything `should_ignore` flags, at any ancestor depth.
pub fn read_all_source_files(root: &Path) -> String {
    collect_all_blocks(root).join("\n")
}

/// Same walk as [`read_all_source_files`], but returns one block per file
/// instead of a single joined string, so callers can truncate by budget.
pub fn collect_all_blocks(root: &Path) -> Vec<String> {
    let mut blocks = Vec::new();
    collect(root, root, &mut blocks);
    blocks
}

fn collect(root: &Path, dir: &Path, blocks: &mut Vec<String>) {
    let Ok(read_dir) = std::fs::read_dir(dir) else {
        return;
    };

    let mut entries: Vec<_> = read_dir.filter_map(|e| e.ok()).collect();
    entries.sort_by_key(|e| e.file_name());

    for entry in entries {
        let name = entry.file_name();
        let Some(name) = name.to_str() else { continue };
        if should_ignore(name) {
            continue;
        }

        let path = entry.path();
        if entry.file_type().map(|ft| ft.is_dir()).unwrap_or(false) {
            collect(root, &path, blocks);
            continue;
        }

        let matches_extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| DEFAULT_EXTENSIONS.contains(&ext))
            .unwrap_or(false);
        if !matches_extension {
            continue;
        }

        let Ok(contents) = std::fs::read_to_string(&path) else {
            continue;
        };
        let rel = path.strip_prefix(root).unwrap_or(&path).display();
        blocks.push(format!("### {rel}\n```\n{contents}\n```\n"));
    }
}

/// Renders a fixed subset of files (the Implementer's focus-files mode),
/// skipping any that don't exist, aren't regular files, or resolve outside
/// the workspace.
pub fn read_focus_files(root: &Path, focus_files: &[String]) -> String {
    let Ok(guard) = PathGuard::new(root) else {
        return String::new();
    };

    let mut blocks = Vec::new();
    for rel in focus_files {
        let Ok(full) = guard.resolve(rel) else {
            continue;
        };
        if !full.is_file() {
            continue;
        }
        if let Ok(contents) = std::fs::read_to_string(&full) {
            blocks.push(format!("### {rel}\n```\n{contents}\n```\n"));
        }
    }
    blocks.join("\n")
}

/// `len(text) // 4`, matching `ContextBuilder.estimate_tokens` exactly.
pub fn estimate_tokens(text: &str) -> usize {
    text.len() / 4
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn dumps_matching_extensions_only() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.rs"), "fn main() {}").unwrap();
        std::fs::write(dir.path().join("a.bin"), "\0\0").unwrap();

        let dump = read_all_source_files(dir.path());
        assert!(dump.contains("a.rs"));
        assert!(dump.contains("fn main"));
        assert!(!dump.contains("a.bin"));
    }

    #[test]
    fn skips_ignored_directories() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join("node_modules")).unwrap();
        std::fs::write(dir.path().join("node_modules/pkg.js"), "x").unwrap();
        std::fs::write(dir.path().join("keep.js"), "y").unwrap();

        let dump = read_all_source_files(dir.path());
        assert!(!dump.contains("pkg.js"));
        assert!(dump.contains("keep.js"));
    }

    #[test]
    fn estimate_tokens_matches_chars_over_four() {
        assert_eq!(estimate_tokens("12345678"), 2);
        assert_eq!(estimate_tokens(""), 0);
    }

    #[test]
    fn focus_files_skips_missing_entries() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("real.rs"), "ok").unwrap();
        let dump = read_focus_files(
            dir.path(),
            &["real.rs".to_string(), "missing.rs".to_string()],
        );
        assert!(dump.contains("real.rs"));
        assert!(!dump.contains("missing.rs"));
    }
}
