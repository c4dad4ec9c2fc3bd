//! Box-drawing directory tree, depth-bounded, matching the original
//! implementation's `ContextBuilder._walk_tree` layout.

use std::path::Path;

/// Names and suffix patterns skipped everywhere a tree or source dump walks
/// the workspace. Mirrors `ContextBuilder.ignore_patterns`.
const IGNORE_EXACT: &[&str] = &[
    ".git",
    "__pycache__",
    "node_modules",
    ".venv",
    "venv",
    ".env",
    ".idea",
    ".vscode",
    ".DS_Store",
    "dist",
    "build",
    ".pytest_cache",
    ".mypy_cache",
];

const IGNORE_SUFFIX: &[&str] = &[".pyc", ".pyo", ".egg-info"];

pub fn should_ignore(name: &str) -> bool {
    IGNORE_EXACT.contains(&name) || IGNORE_SUFFIX.iter().any(|suffix| name.ends_with(suffix))
}

/// Renders a depth-bounded tree of `root` using `├──`/`└──` connectors,
/// directories sorted before files, both sorted case-insensitively.
pub fn build_file_tree(root: &Path, max_depth: u32) -> String {
    let mut lines = Vec::new();
    walk_tree(root, &mut lines, "", max_depth);
    lines.join("\n")
}

fn walk_tree(path: &Path, lines: &mut Vec<String>, prefix: &str, depth: u32) {
    if depth == 0 {
        return;
    }

    let Ok(read_dir) = std::fs::read_dir(path) else {
        return;
    };

    let mut entries: Vec<_> = read_dir
        .filter_map(|entry| entry.ok())
        .filter(|entry| {
            entry
                .file_name()
                .to_str()
                .map(|name| !should_ignore(name))
                .unwrap_or(false)
        })
        .collect();

    entries.sort_by_key(|entry| {
        let is_dir = entry.file_type().map(|ft| ft.is_dir()).unwrap_or(false);
        (!is_dir, entry.file_name().to_string_lossy().to_lowercase())
    });

    let count = entries.len();
    for (i, entry) in entries.into_iter().enumerate() {
        let is_last = i + 1 == count;
        let connector = if is_last { "└── " } else { "├── " };
        let name = entry.file_name().to_string_lossy().into_owned();
        lines.push(format!("{prefix}{connector}{name}"));

        if entry.file_type().map(|ft| ft.is_dir()).unwrap_or(false) {
            let extension = if is_last { "    " } else { "│   " };
            walk_tree(&entry.path(), lines, &format!("{prefix}{extension}"), depth - 1);
        }
    }
}
