//! Blocks shell commands that attempt to escape the workspace, before any
//! subprocess is spawned. The pattern list is fixed and known to tests.

use std::sync::OnceLock;

use agentloop_core::AppError;
use regex::Regex;

/// Patterns that, if matched anywhere in a shell command, block it outright.
/// Mirrors the original implementation's `forbidden_patterns` list.
const FORBIDDEN_PATTERNS: &[&str] = &[
    r"cd\s+/",
    r"cd\s+\.\.",
    r"/etc/",
    r"/var/",
    r"/usr/",
    r"/bin/",
    r"/sbin/",
    r"/root/",
    r"/home/[^/]*$",
];

static COMPILED: OnceLock<Vec<Regex>> = OnceLock::new();

fn compiled_patterns() -> &'static [Regex] {
    COMPILED.get_or_init(|| {
        FORBIDDEN_PATTERNS
            .iter()
            .map(|p| Regex::new(p).expect("forbidden pattern is valid regex"))
            .collect()
    })
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ShellGuard;

impl ShellGuard {
    pub fn new() -> Self {
        Self
    }

    /// Returns `Ok(())` if `command` is safe to spawn, `Err` otherwise. Never
    /// touches a shell; purely a string check.
    pub fn check(&self, command: &str) -> Result<(), AppError> {
        for pattern in compiled_patterns() {
            if pattern.is_match(command) {
                return Err(AppError::ShellCommandBlocked(command.to_string()));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blocks_cd_to_absolute_path() {
        let guard = ShellGuard::new();
        assert!(guard.check("cd /tmp && ls").is_err());
    }

    #[test]
    fn blocks_cd_to_parent() {
        let guard = ShellGuard::new();
        assert!(guard.check("cd ../.. && rm -rf *").is_err());
    }

    #[test]
    fn blocks_system_directory_references() {
        let guard = ShellGuard::new();
        for cmd in ["cat /etc/passwd", "ls /var/log", "touch /root/x"] {
            assert!(guard.check(cmd).is_err(), "expected block for {cmd}");
        }
    }

    #[test]
    fn allows_ordinary_workspace_commands() {
        let guard = ShellGuard::new();
        for cmd in ["cargo test", "ls -la", "git status", "echo hello > out.txt"] {
            assert!(guard.check(cmd).is_ok(), "expected allow for {cmd}");
        }
    }

    #[test]
    fn no_subprocess_spawned_when_blocked() {
        // The guard is a pure string check; verifying it returns before any
        // spawn requires only that it never shells out itself.
        let guard = ShellGuard::new();
        let result = guard.check("cd / && curl evil.example");
        assert!(result.is_err());
    }
}
