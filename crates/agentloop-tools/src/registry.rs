//! Tool dispatch. One registry per agent per cycle; which tool names ever
//! reach the model is controlled by the harness's schema selection
//! (`agentloop_tools::schema`), not by anything in here — this dispatches
//! whatever call it's handed.

use std::time::Duration;

use agentloop_core::{AgentRole, ToolCall, ToolResult};
use agentloop_sandbox::{PathGuard, ShellGuard};
use serde::Deserialize;
use serde_json::Value;
use tokio::process::Command;
use tokio::time::timeout;

use crate::memory::AgentMemory;
use crate::review_sink::ReviewSink;

const DEFAULT_SHELL_TIMEOUT_SECS: u64 = 120;

pub struct ToolRegistry {
    guard: PathGuard,
    shell_guard: ShellGuard,
    memory: AgentMemory,
    review_sink: Option<ReviewSink>,
}

impl ToolRegistry {
    pub fn new(
        root: impl AsRef<std::path::Path>,
        role: AgentRole,
        review_sink: Option<ReviewSink>,
    ) -> std::io::Result<Self> {
        let guard = PathGuard::new(root)?;
        let memory = AgentMemory::new(&guard, role)?;
        Ok(Self {
            guard,
            shell_guard: ShellGuard::new(),
            memory,
            review_sink,
        })
    }

    pub async fn execute(&self, call: &ToolCall) -> ToolResult {
        tracing::debug!(tool = %call.tool_name, call_id = %call.call_id, "dispatching tool call");
        match call.tool_name.as_str() {
            "shell" => self.tool_shell(&call.arguments).await,
            "read" => self.tool_read(&call.arguments),
            "write" => self.tool_write(&call.arguments),
            "delete" => self.tool_delete(&call.arguments),
            "list_dir" => self.tool_list_dir(&call.arguments),
            "search_files" => self.tool_search_files(&call.arguments),
            "search_content" => self.tool_search_content(&call.arguments).await,
            "vcs_status" => self.run_shell("git status", DEFAULT_SHELL_TIMEOUT_SECS).await,
            "vcs_add" => self.tool_vcs_add(&call.arguments).await,
            "vcs_commit" => self.tool_vcs_commit(&call.arguments).await,
            "vcs_log" => self.tool_vcs_log(&call.arguments).await,
            "run_tests" => self.tool_run_tests(&call.arguments).await,
            "memory_read" => self.tool_memory_read(),
            "memory_write" => self.tool_memory_write(&call.arguments),
            "submit_review" => self.tool_submit_review(&call.arguments),
            other => ToolResult::failure(format!("Unknown tool: {other}")),
        }
    }

    async fn tool_shell(&self, args: &Value) -> ToolResult {
        #[derive(Deserialize)]
        struct Args {
            command: String,
            #[serde(default = "default_timeout")]
            timeout: u64,
        }
        fn default_timeout() -> u64 {
            DEFAULT_SHELL_TIMEOUT_SECS
        }

        let args: Args = match serde_json::from_value(args.clone()) {
            Ok(a) => a,
            Err(e) => return ToolResult::failure(format!("malformed arguments: {e}")),
        };
        self.run_shell(&args.command, args.timeout).await
    }

    async fn run_shell(&self, command: &str, timeout_secs: u64) -> ToolResult {
        if let Err(e) = self.shell_guard.check(command) {
            return ToolResult::failure(e.to_string());
        }

        let spawn = Command::new("sh")
            .arg("-c")
            .arg(command)
            .current_dir(self.guard.root())
            .output();

        match timeout(Duration::from_secs(timeout_secs), spawn).await {
            Ok(Ok(output)) => {
                let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
                if !output.stderr.is_empty() {
                    text.push_str("\nSTDERR:\n");
                    text.push_str(&String::from_utf8_lossy(&output.stderr));
                }
                if output.status.success() {
                    ToolResult::success(text)
                } else {
                    ToolResult::failure(format!(
                        "Exit code: {}\n{text}",
                        output.status.code().unwrap_or(-1)
                    ))
                }
            }
            Ok(Err(e)) => ToolResult::failure(e.to_string()),
            Err(_) => ToolResult::failure(format!("Command timed out after {timeout_secs}s")),
        }
    }

    fn tool_read(&self, args: &Value) -> ToolResult {
        #[derive(Deserialize)]
        struct Args {
            path: String,
        }
        let args: Args = match serde_json::from_value(args.clone()) {
            Ok(a) => a,
            Err(e) => return ToolResult::failure(format!("malformed arguments: {e}")),
        };
        let resolved = match self.guard.resolve(&args.path) {
            Ok(p) => p,
            Err(e) => return ToolResult::failure(e.to_string()),
        };
        if !resolved.exists() {
            return ToolResult::failure(format!("File not found: {}", args.path));
        }
        match std::fs::read_to_string(&resolved) {
            Ok(content) => ToolResult::success(content),
            Err(e) => ToolResult::failure(e.to_string()),
        }
    }

    fn tool_write(&self, args: &Value) -> ToolResult {
        #[derive(Deserialize)]
        struct Args {
            path: String,
            content: String,
        }
        let args: Args = match serde_json::from_value(args.clone()) {
            Ok(a) => a,
            Err(e) => return ToolResult::failure(format!("malformed arguments: {e}")),
        };
        let resolved = match self.guard.resolve(&args.path) {
            Ok(p) => p,
            Err(e) => return ToolResult::failure(e.to_string()),
        };
        if let Some(parent) = resolved.parent() {
            if let Err(e) = std::fs::create_dir_all(parent) {
                return ToolResult::failure(e.to_string());
            }
        }
        match std::fs::write(&resolved, &args.content) {
            Ok(()) => ToolResult::success(format!("Written to {}", args.path)),
            Err(e) => ToolResult::failure(e.to_string()),
        }
    }

    fn tool_delete(&self, args: &Value) -> ToolResult {
        #[derive(Deserialize)]
        struct Args {
            path: String,
        }
        let args: Args = match serde_json::from_value(args.clone()) {
            Ok(a) => a,
            Err(e) => return ToolResult::failure(format!("malformed arguments: {e}")),
        };
        let resolved = match self.guard.resolve(&args.path) {
            Ok(p) => p,
            Err(e) => return ToolResult::failure(e.to_string()),
        };
        let result = if resolved.is_dir() {
            std::fs::remove_dir_all(&resolved)
        } else {
            std::fs::remove_file(&resolved)
        };
        match result {
            Ok(()) => ToolResult::success(format!("Deleted {}", args.path)),
            Err(e) => ToolResult::failure(e.to_string()),
        }
    }

    fn tool_list_dir(&self, args: &Value) -> ToolResult {
        #[derive(Deserialize)]
        struct Args {
            #[serde(default = "default_dot")]
            path: String,
            #[serde(default)]
            recursive: bool,
        }
        fn default_dot() -> String {
            ".".to_string()
        }
        let args: Args = match serde_json::from_value(args.clone()) {
            Ok(a) => a,
            Err(e) => return ToolResult::failure(format!("malformed arguments: {e}")),
        };
        let resolved = match self.guard.resolve(&args.path) {
            Ok(p) => p,
            Err(e) => return ToolResult::failure(e.to_string()),
        };
        if !resolved.is_dir() {
            return ToolResult::failure(format!("Not a directory: {}", args.path));
        }

        let entries = if args.recursive {
            walk_recursive(&resolved, self.guard.root())
        } else {
            list_shallow(&resolved)
        };
        match entries {
            Ok(lines) => ToolResult::success(lines.join("\n")),
            Err(e) => ToolResult::failure(e.to_string()),
        }
    }

    fn tool_search_files(&self, args: &Value) -> ToolResult {
        #[derive(Deserialize)]
        struct Args {
            pattern: String,
        }
        let args: Args = match serde_json::from_value(args.clone()) {
            Ok(a) => a,
            Err(e) => return ToolResult::failure(format!("malformed arguments: {e}")),
        };
        let mut matches = Vec::new();
        for entry in walkdir_simple(self.guard.root()) {
            if let Ok(rel) = entry.strip_prefix(self.guard.root()) {
                if glob_match(&args.pattern, &rel.to_string_lossy()) {
                    matches.push(rel.to_string_lossy().into_owned());
                }
            }
        }
        matches.sort();
        ToolResult::success(matches.join("\n"))
    }

    async fn tool_search_content(&self, args: &Value) -> ToolResult {
        #[derive(Deserialize)]
        struct Args {
            pattern: String,
            #[serde(default)]
            #[allow(dead_code)]
            file_pattern: Option<String>,
        }
        let args: Args = match serde_json::from_value(args.clone()) {
            Ok(a) => a,
            Err(e) => return ToolResult::failure(format!("malformed arguments: {e}")),
        };

        let spawn = Command::new("grep")
            .args(["-rn", &args.pattern, "."])
            .current_dir(self.guard.root())
            .output();
        match timeout(Duration::from_secs(60), spawn).await {
            Ok(Ok(output)) => {
                let text = String::from_utf8_lossy(&output.stdout).into_owned();
                ToolResult::success(if text.is_empty() {
                    "No matches found".to_string()
                } else {
                    text
                })
            }
            Ok(Err(e)) => ToolResult::failure(e.to_string()),
            Err(_) => ToolResult::failure("search_content timed out after 60s".to_string()),
        }
    }

    async fn tool_vcs_add(&self, args: &Value) -> ToolResult {
        #[derive(Deserialize)]
        struct Args {
            paths: Vec<String>,
        }
        let args: Args = match serde_json::from_value(args.clone()) {
            Ok(a) => a,
            Err(e) => return ToolResult::failure(format!("malformed arguments: {e}")),
        };
        let quoted: Vec<String> = args.paths.iter().map(|p| format!("\"{p}\"")).collect();
        self.run_shell(&format!("git add {}", quoted.join(" ")), DEFAULT_SHELL_TIMEOUT_SECS)
            .await
    }

    async fn tool_vcs_commit(&self, args: &Value) -> ToolResult {
        #[derive(Deserialize)]
        struct Args {
            message: String,
        }
        let args: Args = match serde_json::from_value(args.clone()) {
            Ok(a) => a,
            Err(e) => return ToolResult::failure(format!("malformed arguments: {e}")),
        };
        let escaped = args.message.replace('"', "\\\"");
        self.run_shell(&format!("git commit -m \"{escaped}\""), DEFAULT_SHELL_TIMEOUT_SECS)
            .await
    }

    async fn tool_vcs_log(&self, args: &Value) -> ToolResult {
        #[derive(Deserialize)]
        struct Args {
            #[serde(default = "default_count")]
            count: u32,
        }
        fn default_count() -> u32 {
            10
        }
        let args: Args = match serde_json::from_value(args.clone()) {
            Ok(a) => a,
            Err(e) => return ToolResult::failure(format!("malformed arguments: {e}")),
        };
        self.run_shell(
            &format!("git log --oneline -n {}", args.count),
            DEFAULT_SHELL_TIMEOUT_SECS,
        )
        .await
    }

    async fn tool_run_tests(&self, args: &Value) -> ToolResult {
        #[derive(Deserialize)]
        struct Args {
            #[serde(default = "default_command")]
            command: String,
            #[serde(default = "default_dot")]
            path: String,
        }
        fn default_command() -> String {
            "cargo test".to_string()
        }
        fn default_dot() -> String {
            ".".to_string()
        }
        let args: Args = match serde_json::from_value(args.clone()) {
            Ok(a) => a,
            Err(e) => return ToolResult::failure(format!("malformed arguments: {e}")),
        };
        self.run_shell(&format!("{} {}", args.command, args.path), 600).await
    }

    fn tool_memory_read(&self) -> ToolResult {
        match self.memory.read() {
            Ok(content) => ToolResult::success(content),
            Err(e) => ToolResult::failure(e.to_string()),
        }
    }

    fn tool_memory_write(&self, args: &Value) -> ToolResult {
        #[derive(Deserialize)]
        struct Args {
            section: String,
            content: String,
            #[serde(default = "default_true")]
            append: bool,
        }
        fn default_true() -> bool {
            true
        }
        let args: Args = match serde_json::from_value(args.clone()) {
            Ok(a) => a,
            Err(e) => return ToolResult::failure(format!("malformed arguments: {e}")),
        };
        match self.memory.write(&args.section, &args.content, args.append) {
            Ok(()) => ToolResult::success(format!("Memory updated in section '{}'", args.section)),
            Err(e) => ToolResult::failure(e.to_string()),
        }
    }

    fn tool_submit_review(&self, args: &Value) -> ToolResult {
        #[derive(Deserialize)]
        struct Args {
            instructions: String,
            score: u8,
        }
        let Some(sink) = &self.review_sink else {
            return ToolResult::failure("submit_review is not available to this agent".to_string());
        };
        let args: Args = match serde_json::from_value(args.clone()) {
            Ok(a) => a,
            Err(e) => return ToolResult::failure(format!("malformed arguments: {e}")),
        };
        sink.submit(args.score, args.instructions);
        ToolResult::success("Review submitted".to_string())
    }
}

fn list_shallow(dir: &std::path::Path) -> std::io::Result<Vec<String>> {
    let mut entries: Vec<_> = std::fs::read_dir(dir)?.filter_map(|e| e.ok()).collect();
    entries.sort_by_key(|e| e.file_name());
    Ok(entries
        .into_iter()
        .map(|e| {
            let prefix = if e.file_type().map(|ft| ft.is_dir()).unwrap_or(false) {
                "d "
            } else {
                "f "
            };
            format!("{prefix}{}", e.file_name().to_string_lossy())
        })
        .collect())
}

fn walk_recursive(dir: &std::path::Path, root: &std::path::Path) -> std::io::Result<Vec<String>> {
    let mut files = Vec::new();
    for path in walkdir_simple(dir) {
        if path.is_file() {
            if let Ok(rel) = path.strip_prefix(root) {
                files.push(rel.to_string_lossy().into_owned());
            }
        }
    }
    files.sort();
    Ok(files)
}

fn walkdir_simple(dir: &std::path::Path) -> Vec<std::path::PathBuf> {
    let mut out = Vec::new();
    let mut stack = vec![dir.to_path_buf()];
    while let Some(current) = stack.pop() {
        let Ok(read_dir) = std::fs::read_dir(&current) else {
            continue;
        };
        for entry in read_dir.filter_map(|e| e.ok()) {
            let path = entry.path();
            if entry.file_type().map(|ft| ft.is_dir()).unwrap_or(false) {
                stack.push(path.clone());
            }
            out.push(path);
        }
    }
    out
}

/// A small glob matcher supporting `*` and `**`, enough for `search_files`
/// patterns like `src/**/*.rs`.
fn glob_match(pattern: &str, candidate: &str) -> bool {
    let regex_str = glob_to_regex(pattern);
    regex::Regex::new(&regex_str)
        .map(|re| re.is_match(candidate))
        .unwrap_or(false)
}

fn glob_to_regex(pattern: &str) -> String {
    let mut out = String::from("^");
    let mut chars = pattern.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '*' => {
                if chars.peek() == Some(&'*') {
                    chars.next();
                    out.push_str(".*");
                } else {
                    out.push_str("[^/]*");
                }
            }
            '?' => out.push_str("[^/]"),
            '.' => out.push_str(r"\."),
            other => out.push(other),
        }
    }
    out.push('$');
    out
}
