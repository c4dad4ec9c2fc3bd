//! Per-agent persistent memory: a single markdown file with `## Section`
//! headers, auto-initialized from a role-specific template on first read.
//! Grounded on the original tool layer's `_memory_read`/`_memory_write`.

use std::path::PathBuf;

use agentloop_core::AgentRole;
use agentloop_sandbox::PathGuard;

const IMPLEMENTER_TEMPLATE: &str = r#"# Implementer Memory

This is your personal memory file. The Reviewer cannot see this.
Use it to remember what you've learned across cycles.

## Architecture
(Project structure and key design decisions you've made)

## Implementation Strategies
(Approaches that worked well for implementing features)

## Common Errors & Solutions
(Bugs you encountered and how you fixed them)

## Testing Commands
(How to run tests, what test frameworks are being used)

## Important Files
(Key files you created/modified and their purposes)

## Dependencies & Setup
(Packages installed, configuration needed)

## Next Steps
(What you should prioritize in your next cycle)
"#;

const REVIEWER_TEMPLATE: &str = r#"# Reviewer Memory

This is your personal memory file. The Implementer cannot see this.
Use it to remember patterns and issues you've observed.

## Incomplete Patterns
(Common ways the Implementer claims completeness but isn't complete)

## Testing Gaps
(Types of tests the Implementer frequently forgets)

## Code Quality Issues
(Recurring code quality problems to watch for)

## Specification Mismatches
(Parts of the spec the Implementer tends to miss or misinterpret)

## Review Strategies
(Effective approaches for catching incompleteness)

## Project Progress
(Objective assessment of what's actually working)

## Priority Issues
(Most critical problems that need fixing next)
"#;

fn template_for(role: AgentRole) -> &'static str {
    match role {
        AgentRole::Implementer => IMPLEMENTER_TEMPLATE,
        AgentRole::Reviewer => REVIEWER_TEMPLATE,
    }
}

fn header_for(role: AgentRole) -> &'static str {
    match role {
        AgentRole::Implementer => "# Implementer Memory",
        AgentRole::Reviewer => "# Reviewer Memory",
    }
}

#[derive(Debug)]
pub struct AgentMemory {
    path: PathBuf,
    role: AgentRole,
}

impl AgentMemory {
    pub fn new(guard: &PathGuard, role: AgentRole) -> std::io::Result<Self> {
        let path = guard
            .root()
            .join(role.memory_file_name());
        Ok(Self { path, role })
    }

    /// Reads the memory file, creating it from the role template if absent.
    pub fn read(&self) -> std::io::Result<String> {
        if !self.path.exists() {
            let initial = template_for(self.role).to_string();
            std::fs::write(&self.path, &initial)?;
            return Ok(initial);
        }
        std::fs::read_to_string(&self.path)
    }

    /// Writes `content` into `## section`, appending or replacing that
    /// section's body, creating the section at the end of the file if it
    /// doesn't exist yet.
    pub fn write(&self, section: &str, content: &str, append: bool) -> std::io::Result<()> {
        let existing = if self.path.exists() {
            std::fs::read_to_string(&self.path)?
        } else {
            format!("{}\n\n", header_for(self.role))
        };

        let section_header = format!("## {section}");
        let mut lines: Vec<&str> = existing.split('\n').collect();

        let mut section_start: Option<usize> = None;
        let mut section_end: Option<usize> = None;
        for (i, line) in lines.iter().enumerate() {
            if line.trim() == section_header {
                section_start = Some(i);
            } else if section_start.is_some() && section_end.is_none() && line.trim().starts_with("## ") {
                section_end = Some(i);
                break;
            }
        }

        let new_content = match section_start {
            None => {
                let mut base = existing.clone();
                if !base.ends_with("\n\n") {
                    base.push_str("\n\n");
                }
                format!("{base}{section_header}\n{content}\n")
            }
            Some(start) => {
                let end = section_end.unwrap_or(lines.len());
                if append {
                    lines.insert(end, content);
                } else {
                    let mut rebuilt: Vec<&str> = lines[..=start].to_vec();
                    rebuilt.push(content);
                    rebuilt.extend_from_slice(&lines[end..]);
                    lines = rebuilt;
                }
                lines.join("\n")
            }
        };

        std::fs::write(&self.path, new_content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn guard(dir: &TempDir) -> PathGuard {
        PathGuard::new(dir.path()).unwrap()
    }

    #[test]
    fn first_read_creates_role_template() {
        let dir = TempDir::new().unwrap();
        let memory = AgentMemory::new(&guard(&dir), AgentRole::Implementer).unwrap();
        let content = memory.read().unwrap();
        assert!(content.contains("Implementer Memory"));
        assert!(dir.path().join("IMPLEMENTER_MEMORY.md").exists());
    }

    #[test]
    fn reviewer_template_differs_from_implementer() {
        let dir = TempDir::new().unwrap();
        let memory = AgentMemory::new(&guard(&dir), AgentRole::Reviewer).unwrap();
        let content = memory.read().unwrap();
        assert!(content.contains("Reviewer Memory"));
        assert!(content.contains("Incomplete Patterns"));
    }

    #[test]
    fn write_appends_to_existing_section() {
        let dir = TempDir::new().unwrap();
        let memory = AgentMemory::new(&guard(&dir), AgentRole::Implementer).unwrap();
        memory.read().unwrap();
        memory
            .write("Architecture", "Uses a layered service design.", true)
            .unwrap();
        let content = memory.read().unwrap();
        assert!(content.contains("Uses a layered service design."));
        assert!(content.contains("(Project structure"));
    }

    #[test]
    fn write_replace_overwrites_section_body() {
        let dir = TempDir::new().unwrap();
        let memory = AgentMemory::new(&guard(&dir), AgentRole::Implementer).unwrap();
        memory.read().unwrap();
        memory.write("Next Steps", "Finish the parser.", false).unwrap();
        let content = memory.read().unwrap();
        assert!(content.contains("Finish the parser."));
        assert!(!content.contains("(What you should prioritize"));
    }

    #[test]
    fn write_to_missing_section_appends_new_one_at_end() {
        let dir = TempDir::new().unwrap();
        let memory = AgentMemory::new(&guard(&dir), AgentRole::Implementer).unwrap();
        memory.read().unwrap();
        memory.write("Custom Notes", "ad-hoc observation", true).unwrap();
        let content = memory.read().unwrap();
        assert!(content.contains("## Custom Notes"));
        assert!(content.contains("ad-hoc observation"));
    }
}
