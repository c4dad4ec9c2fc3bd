//! Commit message sanitization and test-gated commit decisions. Grounded on
//! `orchestrator.py`'s `_sanitize_commit_message`, `_execute_git_commit`,
//! `_analyze_test_results`, and `_should_commit_based_on_tests` — ported
//! line for line where the original names a concrete rule.

use std::sync::OnceLock;

use agentloop_core::Phase;
use regex::Regex;

/// Claims Agent 1 (rephrased here: the Implementer) might assert about its
/// own work that Agent 2 (the Reviewer) must never see secondhand, since the
/// Reviewer's whole value is judging the filesystem, not the Implementer's
/// self-report.
const BIAS_PHRASES: &[&str] = &[
    "fully implemented",
    "completely implemented",
    "fully complete",
    "comprehensive",
    "thorough",
    "complete solution",
    "perfect",
    "all edge cases",
    "all requirements",
    "everything working",
    "production ready",
    "fully tested",
    "comprehensive testing",
];

static BIAS_PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();

fn bias_patterns() -> &'static [Regex] {
    BIAS_PATTERNS.get_or_init(|| {
        BIAS_PHRASES
            .iter()
            .map(|phrase| Regex::new(&format!("(?i){phrase}")).unwrap())
            .collect()
    })
}

/// Strips completeness-claim bias from a raw commit message, collapses
/// whitespace, and appends a `[phase]`/`Completeness:` trailer. Falls back
/// to a neutral message if sanitization empties it out.
pub fn sanitize_commit_message(message: &str, phase: Phase, latest_score: Option<u8>) -> String {
    let mut sanitized = message.to_string();
    for pattern in bias_patterns() {
        sanitized = pattern.replace_all(&sanitized, "").into_owned();
    }

    sanitized = sanitized.split_whitespace().collect::<Vec<_>>().join(" ");

    if sanitized.trim().is_empty() {
        sanitized = "Auto-commit: code changes".to_string();
    }

    if let Some(score) = latest_score {
        sanitized = format!("[{phase}] {sanitized}\nCompleteness: {score}%");
    }

    sanitized
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedCommitInstructions {
    pub files_to_add: Vec<String>,
    pub message: Option<String>,
}

/// Extracts `git add <files>` and `git commit -m "..."` intent from the
/// Reviewer's free-form commit instructions. Mirrors the original's
/// line-scanning parser, including its tolerance for a message spanning
/// multiple lines between the opening and closing quote.
pub fn parse_commit_instructions(instructions: &str) -> ParsedCommitInstructions {
    let lines: Vec<&str> = instructions.lines().collect();
    let mut files_to_add = Vec::new();
    let mut message = None;
    let mut in_commit_section = false;

    let mut i = 0;
    while i < lines.len() {
        let line = lines[i];
        if line.starts_with("git add") {
            let parts: Vec<&str> = line.split_whitespace().collect();
            if parts.len() >= 3 {
                files_to_add.extend(parts[2..].iter().map(|s| s.to_string()));
            }
        } else if line.starts_with("git commit") {
            in_commit_section = true;
        } else if in_commit_section && line.contains("-m \"") {
            let quote_start = line.find('"').unwrap() + 1;
            if let Some(rel_close) = line[quote_start..].find('"') {
                // Closing quote on the same line.
                message = Some(line[quote_start..quote_start + rel_close].to_string());
            } else {
                // Message spans multiple lines; keep collecting until a
                // closing quote turns up.
                let mut collected = line[quote_start..].to_string();
                let mut j = i + 1;
                while j < lines.len() && !lines[j].contains('"') {
                    collected.push('\n');
                    collected.push_str(lines[j]);
                    j += 1;
                }
                if j < lines.len() {
                    if let Some(closing) = lines[j].find('"') {
                        collected.push('\n');
                        collected.push_str(&lines[j][..closing]);
                    }
                }
                message = Some(collected);
            }
            break;
        }
        i += 1;
    }

    if files_to_add.is_empty() {
        files_to_add.push(".".to_string());
    }

    ParsedCommitInstructions { files_to_add, message }
}

/// Condenses raw test-runner output into a one-line summary for status logs.
pub fn analyze_test_results(test_results: &str) -> String {
    let lower = test_results.to_lowercase();

    if lower.contains("passed") && lower.contains("failed") {
        let passed = extract_count(&lower, "passed");
        let failed = extract_count(&lower, "failed");
        if let (Some(p), Some(f)) = (passed, failed) {
            return format!("{p} passed, {f} failed");
        }
    }

    if lower.contains("passed") {
        return "All tests passed".to_string();
    }
    if lower.contains("failed") || lower.contains("error") {
        return "Tests failed".to_string();
    }

    "Tests executed".to_string()
}

fn extract_count(lower: &str, keyword: &str) -> Option<u32> {
    static PATTERNS: OnceLock<(Regex, Regex)> = OnceLock::new();
    let (passed_re, failed_re) = PATTERNS.get_or_init(|| {
        (
            Regex::new(r"(\d+) passed").unwrap(),
            Regex::new(r"(\d+) failed").unwrap(),
        )
    });
    let re = if keyword == "passed" { passed_re } else { failed_re };
    re.captures(lower)?.get(1)?.as_str().parse().ok()
}

/// Implementation phase: commit only if tests passed or none ran. Testing
/// phase: always commit, so the Reviewer sees the failures on disk.
pub fn should_commit_based_on_tests(phase: Phase, test_results: &str) -> bool {
    if phase == Phase::Testing {
        return true;
    }

    let lower = test_results.to_lowercase();
    if (lower.contains("passed") && !lower.contains("failed")) || lower.contains("all tests passed") {
        return true;
    }
    if lower.contains("failed") || lower.contains("error") {
        return false;
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_bias_phrases_case_insensitively() {
        let sanitized = sanitize_commit_message("FULLY IMPLEMENTED the auth system", Phase::Implementation, None);
        assert!(!sanitized.to_lowercase().contains("fully implemented"));
        assert!(sanitized.contains("the auth system"));
    }

    #[test]
    fn empty_after_sanitization_falls_back_to_default() {
        let sanitized = sanitize_commit_message("comprehensive thorough perfect", Phase::Implementation, None);
        assert!(sanitized.starts_with("Auto-commit: code changes"));
    }

    #[test]
    fn appends_phase_and_score_trailer() {
        let sanitized = sanitize_commit_message("add parser", Phase::Testing, Some(72));
        assert!(sanitized.starts_with("[testing] add parser"));
        assert!(sanitized.ends_with("Completeness: 72%"));
    }

    #[test]
    fn parses_add_and_commit_message() {
        let instructions = "git add src/main.rs src/lib.rs\ngit commit -m \"Add parser module\"";
        let parsed = parse_commit_instructions(instructions);
        assert_eq!(parsed.files_to_add, vec!["src/main.rs", "src/lib.rs"]);
        assert_eq!(parsed.message.as_deref(), Some("Add parser module"));
    }

    #[test]
    fn defaults_to_dot_when_no_add_line_given() {
        let parsed = parse_commit_instructions("git commit -m \"fix bug\"");
        assert_eq!(parsed.files_to_add, vec!["."]);
    }

    #[test]
    fn missing_commit_message_is_none() {
        let parsed = parse_commit_instructions("git add .");
        assert!(parsed.message.is_none());
    }

    #[test]
    fn analyze_counts_passed_and_failed() {
        assert_eq!(analyze_test_results("3 passed, 1 failed"), "3 passed, 1 failed");
    }

    #[test]
    fn analyze_reports_all_passed() {
        assert_eq!(analyze_test_results("test result: ok. 5 passed"), "All tests passed");
    }

    #[test]
    fn testing_phase_always_commits() {
        assert!(should_commit_based_on_tests(Phase::Testing, "2 failed"));
    }

    #[test]
    fn implementation_phase_blocks_commit_on_failure() {
        assert!(!should_commit_based_on_tests(Phase::Implementation, "1 passed, 1 failed"));
    }

    #[test]
    fn implementation_phase_commits_on_all_pass() {
        assert!(should_commit_based_on_tests(Phase::Implementation, "all tests passed"));
    }
}
