//! Tool schemas handed to the backend so the model knows what it can call.
//! Catalog membership is filtered by role and, for the Reviewer, by phase of
//! its own two-stage call (see `agentloop-agents::reviewer`).

use serde_json::{json, Value};

#[derive(Debug, Clone)]
pub struct ToolSchema {
    pub name: &'static str,
    pub description: &'static str,
    pub parameters: Value,
}

/// The full catalog available to the Implementer.
pub fn implementer_schemas() -> Vec<ToolSchema> {
    vec![
        ToolSchema {
            name: "shell",
            description: "Execute a shell command in the workspace",
            parameters: json!({
                "type": "object",
                "properties": {
                    "command": {"type": "string"},
                    "timeout": {"type": "integer", "description": "seconds, default 120"}
                },
                "required": ["command"]
            }),
        },
        ToolSchema {
            name: "read",
            description: "Read a file's contents",
            parameters: json!({
                "type": "object",
                "properties": {"path": {"type": "string"}},
                "required": ["path"]
            }),
        },
        ToolSchema {
            name: "write",
            description: "Write text to a file, creating parent directories and overwriting",
            parameters: json!({
                "type": "object",
                "properties": {
                    "path": {"type": "string"},
                    "content": {"type": "string"}
                },
                "required": ["path", "content"]
            }),
        },
        ToolSchema {
            name: "delete",
            description: "Delete a file or directory tree",
            parameters: json!({
                "type": "object",
                "properties": {"path": {"type": "string"}},
                "required": ["path"]
            }),
        },
        ToolSchema {
            name: "list_dir",
            description: "List a directory's entries",
            parameters: json!({
                "type": "object",
                "properties": {
                    "path": {"type": "string", "default": "."},
                    "recursive": {"type": "boolean", "default": false}
                }
            }),
        },
        ToolSchema {
            name: "search_files",
            description: "Find files by glob pattern",
            parameters: json!({
                "type": "object",
                "properties": {"pattern": {"type": "string"}},
                "required": ["pattern"]
            }),
        },
        ToolSchema {
            name: "search_content",
            description: "Search file contents by regex",
            parameters: json!({
                "type": "object",
                "properties": {
                    "pattern": {"type": "string"},
                    "file_pattern": {"type": "string", "default": "**/*"}
                },
                "required": ["pattern"]
            }),
        },
        ToolSchema {
            name: "vcs_status",
            description: "Show repository status",
            parameters: json!({"type": "object", "properties": {}}),
        },
        ToolSchema {
            name: "vcs_add",
            description: "Stage paths",
            parameters: json!({
                "type": "object",
                "properties": {"paths": {"type": "array", "items": {"type": "string"}}},
                "required": ["paths"]
            }),
        },
        ToolSchema {
            name: "vcs_commit",
            description: "Commit staged changes",
            parameters: json!({
                "type": "object",
                "properties": {"message": {"type": "string"}},
                "required": ["message"]
            }),
        },
        ToolSchema {
            name: "vcs_log",
            description: "Show recent commits",
            parameters: json!({
                "type": "object",
                "properties": {"count": {"type": "integer", "default": 10}}
            }),
        },
        ToolSchema {
            name: "run_tests",
            description: "Run the test suite",
            parameters: json!({
                "type": "object",
                "properties": {
                    "command": {"type": "string", "default": "cargo test"},
                    "path": {"type": "string", "default": "."}
                }
            }),
        },
        ToolSchema {
            name: "memory_read",
            description: "Read your private memory file",
            parameters: json!({"type": "object", "properties": {}}),
        },
        ToolSchema {
            name: "memory_write",
            description: "Write a section of your private memory file",
            parameters: json!({
                "type": "object",
                "properties": {
                    "section": {"type": "string"},
                    "content": {"type": "string"},
                    "append": {"type": "boolean", "default": true}
                },
                "required": ["section", "content"]
            }),
        },
    ]
}

/// The Reviewer's first-stage catalog: memory plus the verdict tool.
pub fn reviewer_schemas() -> Vec<ToolSchema> {
    let mut schemas: Vec<ToolSchema> = implementer_schemas()
        .into_iter()
        .filter(|s| s.name == "memory_read" || s.name == "memory_write")
        .collect();
    schemas.push(ToolSchema {
        name: "submit_review",
        description: "Submit the review verdict: next instructions and a completeness score",
        parameters: json!({
            "type": "object",
            "properties": {
                "instructions": {"type": "string"},
                "score": {"type": "integer", "minimum": 0, "maximum": 100}
            },
            "required": ["instructions", "score"]
        }),
    });
    schemas
}

/// The Reviewer's second-stage catalog: memory tools only, per spec.md §4.6
/// step 2 ("a follow-up call bounded to memory tools only").
pub fn reviewer_followup_schemas() -> Vec<ToolSchema> {
    implementer_schemas()
        .into_iter()
        .filter(|s| s.name == "memory_read" || s.name == "memory_write")
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reviewer_schemas_exclude_mutating_tools() {
        let names: Vec<_> = reviewer_schemas().iter().map(|s| s.name).collect();
        assert!(!names.contains(&"shell"));
        assert!(!names.contains(&"write"));
        assert!(!names.contains(&"vcs_commit"));
        assert!(names.contains(&"submit_review"));
    }

    #[test]
    fn reviewer_followup_excludes_submit_review_too() {
        let names: Vec<_> = reviewer_followup_schemas().iter().map(|s| s.name).collect();
        assert!(!names.contains(&"submit_review"));
        assert!(names.contains(&"memory_write"));
    }

    #[test]
    fn implementer_catalog_has_expected_count() {
        assert_eq!(implementer_schemas().len(), 14);
    }
}
