//! Heuristic fallback parser for free-form Reviewer output, used only when
//! the model skips the `submit_review` tool. Mirrors the original
//! `ReviewResult.parse` section-state-machine and score-pattern fallback
//! chain exactly, since its behavior is load-bearing: spec.md §4.6 calls
//! this parser out by name as the last resort.

use std::sync::OnceLock;

use regex::Regex;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedReview {
    pub score: u8,
    pub completed_items: Vec<String>,
    pub remaining_work: Vec<String>,
    pub issues_found: Vec<String>,
    pub commit_instructions: String,
    pub next_instructions: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Score,
    Completed,
    Remaining,
    Issues,
    Commit,
    Next,
}

struct ScorePatterns {
    fraction: Regex,
    percent: Regex,
    colon: Regex,
    bare: Regex,
}

static SCORE_PATTERNS: OnceLock<ScorePatterns> = OnceLock::new();

fn score_patterns() -> &'static ScorePatterns {
    SCORE_PATTERNS.get_or_init(|| ScorePatterns {
        fraction: Regex::new(r"(\d+)\s*/\s*100").unwrap(),
        percent: Regex::new(r"(\d+)\s*%").unwrap(),
        colon: Regex::new(r":\s*(\d+)").unwrap(),
        bare: Regex::new(r"\b(\d+)\b").unwrap(),
    })
}

fn extract_score(line: &str) -> Option<u8> {
    let patterns = score_patterns();
    let captured = patterns
        .fraction
        .captures(line)
        .or_else(|| patterns.percent.captures(line))
        .or_else(|| patterns.colon.captures(line))
        .or_else(|| patterns.bare.captures(line))?;
    let value: u32 = captured.get(1)?.as_str().parse().ok()?;
    (value <= 100).then_some(value as u8)
}

/// Parses free-form Reviewer content into a score and next-step instructions.
/// `next_instructions` falls back to the full raw content if no recognizable
/// "next instructions" section was found, so the Implementer always has
/// *something* to act on.
pub fn parse_heuristic(content: &str) -> ParsedReview {
    let mut score = 0u8;
    let mut completed = Vec::new();
    let mut remaining = Vec::new();
    let mut issues = Vec::new();
    let mut commit_instr = String::new();
    let mut next_instr = String::new();

    let mut current_section: Option<Section> = None;
    let mut section_lines: Vec<&str> = Vec::new();

    for line in content.lines() {
        let lower = line.to_lowercase();
        let trimmed_lower = lower.trim();

        if trimmed_lower.contains("completeness")
            || (trimmed_lower.contains("complete") && current_section != Some(Section::Completed))
        {
            if let Some(found) = extract_score(line) {
                score = found;
                current_section = Some(Section::Score);
                continue;
            }
        }
        if trimmed_lower.contains("what was just completed") || trimmed_lower.contains("completed:") {
            current_section = Some(Section::Completed);
            continue;
        }
        if trimmed_lower.contains("remaining work") {
            current_section = Some(Section::Remaining);
            continue;
        }
        if trimmed_lower.contains("issues found") || trimmed_lower.contains("specific issues") {
            current_section = Some(Section::Issues);
            continue;
        }
        if trimmed_lower.contains("commit instructions") {
            current_section = Some(Section::Commit);
            section_lines.clear();
            continue;
        }
        if trimmed_lower.contains("next instructions") || trimmed_lower.contains("instructions for") {
            if current_section == Some(Section::Commit) {
                commit_instr = section_lines.join("\n");
            }
            current_section = Some(Section::Next);
            section_lines.clear();
            continue;
        }

        let trimmed = line.trim();
        match current_section {
            Some(Section::Completed) if trimmed.starts_with('-') => {
                completed.push(trimmed.trim_start_matches('-').trim().to_string());
            }
            Some(Section::Remaining) if is_list_item(trimmed) => {
                remaining.push(strip_list_marker(trimmed));
            }
            Some(Section::Issues) if trimmed.starts_with('-') => {
                issues.push(trimmed.trim_start_matches('-').trim().to_string());
            }
            Some(Section::Commit) | Some(Section::Next) => {
                section_lines.push(line);
            }
            _ => {}
        }
    }

    match current_section {
        Some(Section::Commit) => commit_instr = section_lines.join("\n"),
        Some(Section::Next) => next_instr = section_lines.join("\n"),
        _ => {}
    }

    if next_instr.is_empty() && !section_lines.is_empty() {
        next_instr = section_lines.join("\n");
    }

    ParsedReview {
        score,
        completed_items: completed,
        remaining_work: remaining,
        issues_found: issues,
        commit_instructions: commit_instr,
        next_instructions: if next_instr.is_empty() {
            content.to_string()
        } else {
            next_instr
        },
    }
}

fn is_list_item(trimmed: &str) -> bool {
    if trimmed.starts_with('-') {
        return true;
    }
    let prefix: String = trimmed.chars().take(2).collect();
    !prefix.is_empty() && prefix.replace('.', "").chars().all(|c| c.is_ascii_digit())
}

fn strip_list_marker(trimmed: &str) -> String {
    trimmed.trim_start_matches(['-', '0', '1', '2', '3', '4', '5', '6', '7', '8', '9', '.', ' ']).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_score_from_fraction_form() {
        let review = parse_heuristic("Completeness: 72/100\n\nNext Instructions:\nDo X");
        assert_eq!(review.score, 72);
        assert!(review.next_instructions.contains("Do X"));
    }

    #[test]
    fn extracts_score_from_percent_form() {
        let review = parse_heuristic("Completeness is 40% done so far.");
        assert_eq!(review.score, 40);
    }

    #[test]
    fn falls_back_to_full_content_when_no_next_section() {
        let review = parse_heuristic("Just some free text with no sections.");
        assert_eq!(review.next_instructions, "Just some free text with no sections.");
    }

    #[test]
    fn collects_remaining_work_bullets() {
        let content = "Completeness: 50%\n\nRemaining Work:\n- add tests\n- handle errors\n\nNext Instructions:\n1. write tests";
        let review = parse_heuristic(content);
        assert_eq!(review.remaining_work, vec!["add tests", "handle errors"]);
        assert!(review.next_instructions.contains("write tests"));
    }

    #[test]
    fn score_out_of_range_is_ignored() {
        // "999" isn't matched by any bounded pattern here; score stays 0.
        let review = parse_heuristic("Completeness section mentions build 999 somewhere");
        assert_eq!(review.score, 0);
    }
}
