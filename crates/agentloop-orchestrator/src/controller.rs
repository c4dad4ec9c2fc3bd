//! The per-cycle driver and its outer run loop. Grounded on
//! `orchestrator.py`'s `Orchestrator.run_cycle`/`run`/`pause`/`get_status`.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use agentloop_agents::{Implementer, Reviewer};
use agentloop_backend::Backend;
use agentloop_config::{
    LoopConfig, DEFAULT_IMPLEMENTER_PROMPT, DEFAULT_REVIEWER_IMPLEMENTATION_PROMPT,
    DEFAULT_REVIEWER_TESTING_PROMPT,
};
use agentloop_core::{AgentRole, CycleRecord, Phase, ReviewVerdict, ToolCall};
use agentloop_tools::registry::ToolRegistry;
use agentloop_tools::review_sink::ReviewSink;
use chrono::Utc;

use crate::commit_policy::{
    analyze_test_results, parse_commit_instructions, sanitize_commit_message,
    should_commit_based_on_tests,
};
use crate::observer::{NullObserver, Observer};
use crate::state::LoopState;

const MAX_CONSECUTIVE_ERRORS: u32 = 3;
const ERROR_RETRY_DELAY: Duration = Duration::from_secs(5);
const SPEC_SUMMARY_CHARS: usize = 500;

/// What one completed (or failed) cycle produced, for callers driving the
/// loop cycle-by-cycle (a CLI progress line, a test assertion) rather than
/// through `run`. Field set mirrors the `CycleResult` tuple the distilled
/// specification names for the `on_cycle_complete` callback: cycle number,
/// verdict, per-cycle token usage for each agent, duration, error.
#[derive(Debug, Clone)]
pub struct CycleOutcome {
    pub cycle_number: u32,
    pub verdict: Option<ReviewVerdict>,
    pub completeness_score: u8,
    pub is_complete: bool,
    pub implementer_tokens: u64,
    pub reviewer_tokens: u64,
    pub error: Option<String>,
    pub duration: Duration,
}

pub struct Controller {
    workspace: PathBuf,
    config: LoopConfig,
    backend: Arc<dyn Backend>,
    observer: Arc<dyn Observer>,
    state: LoopState,
    original_spec: String,
    implementer_prompt: String,
    reviewer_implementation_prompt: String,
    reviewer_testing_prompt: String,
}

impl Controller {
    pub fn new(
        workspace: impl Into<PathBuf>,
        original_spec: impl Into<String>,
        config: LoopConfig,
        backend: Arc<dyn Backend>,
    ) -> Self {
        Self::with_observer(workspace, original_spec, config, backend, Arc::new(NullObserver))
    }

    pub fn with_observer(
        workspace: impl Into<PathBuf>,
        original_spec: impl Into<String>,
        config: LoopConfig,
        backend: Arc<dyn Backend>,
        observer: Arc<dyn Observer>,
    ) -> Self {
        let mut implementer_prompt =
            resolve_prompt(&config.agents.implementer_prompt, DEFAULT_IMPLEMENTER_PROMPT);
        if config.features.auto_fix_tests {
            implementer_prompt.push_str(
                "\n\nIf `run_tests` reports failures, treat fixing them as part of this cycle's work rather than reporting the failure and stopping.",
            );
        }
        let reviewer_implementation_prompt = resolve_prompt(
            &config.agents.reviewer_implementation_prompt,
            DEFAULT_REVIEWER_IMPLEMENTATION_PROMPT,
        );
        let reviewer_testing_prompt =
            resolve_prompt(&config.agents.reviewer_testing_prompt, DEFAULT_REVIEWER_TESTING_PROMPT);

        Self {
            workspace: workspace.into(),
            config,
            backend,
            observer,
            state: LoopState::default(),
            original_spec: original_spec.into(),
            implementer_prompt,
            reviewer_implementation_prompt,
            reviewer_testing_prompt,
        }
    }

    pub fn state(&self) -> &LoopState {
        &self.state
    }

    fn notify(&self, status: impl AsRef<str>) {
        self.observer.on_status_change(status.as_ref());
    }

    /// Runs exactly one implement-then-review cycle and returns its outcome.
    /// Never panics on agent failure: a failed Implementer or Reviewer call
    /// produces a fallback verdict so the loop can recover next cycle,
    /// mirroring the original's `try/except` fallback-review branches.
    pub async fn run_cycle(&mut self) -> CycleOutcome {
        let cycle_start = Instant::now();
        self.state.cycle_count += 1;
        let cycle_num = self.state.cycle_count;

        tracing::info!(cycle = cycle_num, phase = %self.state.phase, "cycle starting");
        self.notify(format!("Cycle {cycle_num}: Implementer working..."));

        let instructions = match &self.state.last_verdict {
            Some(verdict) => verdict.next_instructions.clone(),
            None => format!(
                "This is the initial implementation cycle.\n\n\
                 Read the specification carefully and begin implementing the project.\n\
                 Start with the core structure and work incrementally.\n\n\
                 SPECIFICATION:\n{}\n\nBegin implementation now.\n",
                self.original_spec
            ),
        };

        let (codebase_context, _snapshot) = agentloop_context::build_implementer_context(
            &self.workspace,
            None,
            self.config.agents.implementer_context_token_limit as usize,
        );
        let last_commit = agentloop_context::assembler::last_commit_summary(&self.workspace).await;
        let task_summary = if self.original_spec.len() > SPEC_SUMMARY_CHARS {
            format!("{}...", &self.original_spec[..SPEC_SUMMARY_CHARS])
        } else {
            self.original_spec.clone()
        };

        let implementer_tools = match ToolRegistry::new(&self.workspace, AgentRole::Implementer, None) {
            Ok(tools) => tools,
            Err(e) => return self.error_outcome(cycle_num, cycle_start, format!("Implementer setup error: {e}")),
        };
        let implementer = Implementer::new(
            Arc::clone(&self.backend),
            implementer_tools,
            self.implementer_prompt.clone(),
            self.config.agents.max_tool_iterations,
            self.config.model.max_tokens,
            self.config.model.temperature,
        );

        let implementer_response = implementer
            .run(
                &instructions,
                &codebase_context,
                Some(&last_commit),
                Some(&task_summary),
            )
            .await;
        self.state.total_implementer_usage += implementer_response.usage;

        let phase_label = if self.state.phase == Phase::Testing { "testing" } else { "implementation" };
        self.notify(format!("Cycle {cycle_num}: Reviewer reviewing ({phase_label})..."));

        // Bias isolation: the Reviewer's context comes only from the
        // filesystem and git history, never from `implementer_response`.
        let (codebase_for_review, _snapshot) = agentloop_context::build_reviewer_context(
            &self.workspace,
            self.config.agents.reviewer_context_token_limit as usize,
        )
        .await;
        let git_log = agentloop_context::git::get_git_log(&self.workspace, 10).await;

        let review_sink = ReviewSink::new();
        let reviewer_tools =
            match ToolRegistry::new(&self.workspace, AgentRole::Reviewer, Some(review_sink.clone())) {
                Ok(tools) => tools,
                Err(e) => return self.error_outcome(cycle_num, cycle_start, format!("Reviewer setup error: {e}")),
            };
        let reviewer_prompt = if self.state.phase == Phase::Testing {
            self.reviewer_testing_prompt.clone()
        } else {
            self.reviewer_implementation_prompt.clone()
        };
        let reviewer = Reviewer::new(
            Arc::clone(&self.backend),
            reviewer_tools,
            review_sink,
            reviewer_prompt,
            self.config.model.max_tokens,
            self.config.model.temperature,
        );

        let (verdict, reviewer_usage) = reviewer
            .review(
                &self.original_spec,
                &codebase_for_review,
                &git_log,
                self.config.limits.completion_threshold,
            )
            .await;
        self.state.total_reviewer_usage += reviewer_usage;
        self.state.last_verdict = Some(verdict.clone());

        self.state.completeness_history.push(CycleRecord {
            cycle_number: cycle_num,
            score: verdict.score,
            phase: self.state.phase,
            timestamp: Utc::now(),
        });

        self.maybe_commit(&verdict).await;

        if self.state.phase == Phase::Implementation
            && verdict.score >= self.config.agents.testing_phase_threshold
        {
            self.state.phase = Phase::Testing;
            tracing::info!(cycle = cycle_num, score = verdict.score, "phase transition: implementation -> testing");
            self.notify(format!("Phase transition: switching to testing mode (score: {}%)", verdict.score));
        }

        if verdict.is_complete {
            self.state.is_complete = true;
            tracing::info!(cycle = cycle_num, score = verdict.score, "specification marked complete");
        }

        if let Err(e) = self.state.save(&self.workspace) {
            tracing::warn!(cycle = cycle_num, error = %e, "failed to save loop state");
            self.notify(format!("Error saving state: {e}"));
        }

        let outcome = CycleOutcome {
            cycle_number: cycle_num,
            completeness_score: verdict.score,
            is_complete: verdict.is_complete,
            implementer_tokens: implementer_response.usage.total,
            reviewer_tokens: reviewer_usage.total,
            verdict: Some(verdict),
            error: None,
            duration: cycle_start.elapsed(),
        };
        tracing::debug!(
            cycle = cycle_num,
            score = outcome.completeness_score,
            duration_ms = outcome.duration.as_millis() as u64,
            "cycle finished"
        );
        self.observer.on_cycle_complete(&outcome);
        outcome
    }

    fn error_outcome(&mut self, cycle_num: u32, cycle_start: Instant, message: String) -> CycleOutcome {
        tracing::warn!(cycle = cycle_num, %message, "cycle failed; falling back to a recovery verdict");
        self.notify(&message);
        let fallback = ReviewVerdict {
            score: self.state.latest_score(),
            next_instructions: format!("{message}. Continue with the current task based on the original specification."),
            is_complete: false,
            commit_instructions: None,
            remaining_work: vec![message.clone()],
            raw_content: message.clone(),
        };
        self.state.last_verdict = Some(fallback.clone());
        CycleOutcome {
            cycle_number: cycle_num,
            completeness_score: self.state.latest_score(),
            is_complete: false,
            implementer_tokens: 0,
            reviewer_tokens: 0,
            verdict: Some(fallback),
            error: Some(message),
            duration: cycle_start.elapsed(),
        }
    }

    /// Runs tests, decides whether to commit based on the current phase and
    /// test outcome, then executes the Reviewer's commit instructions
    /// (sanitized) if the decision is to go ahead. A missing
    /// `commit_instructions` (no `submit_review`/heuristic commit block)
    /// skips committing entirely, same as the original's `if commit_message:` gate.
    async fn maybe_commit(&mut self, verdict: &ReviewVerdict) {
        if self.state.commit_count >= self.config.limits.max_commits {
            return;
        }

        let Some(commit_instructions) = verdict.commit_instructions.as_deref() else {
            return;
        };

        let test_results = self.run_tests_before_commit().await;

        let should_commit = match &test_results {
            Some(results) => {
                let decision = should_commit_based_on_tests(self.state.phase, results);
                if !decision {
                    self.notify("Skipping commit: tests are failing");
                }
                decision
            }
            None => true,
        };

        if !should_commit {
            return;
        }

        self.execute_git_commit(commit_instructions).await;
    }

    async fn run_tests_before_commit(&self) -> Option<String> {
        let tools = ToolRegistry::new(&self.workspace, AgentRole::Implementer, None).ok()?;
        let call = ToolCall {
            call_id: "run_tests_before_commit".to_string(),
            tool_name: "run_tests".to_string(),
            arguments: serde_json::json!({}),
        };
        let result = tools.execute(&call).await;
        let output = result.as_model_text();
        if !result.success || output.contains("No tests found") {
            self.notify("No tests found - proceeding without test verification");
            return None;
        }
        let summary = analyze_test_results(&output);
        self.notify(format!("Tests run: {summary}"));
        Some(output)
    }

    async fn execute_git_commit(&mut self, commit_instructions: &str) {
        let parsed = parse_commit_instructions(commit_instructions);
        let Some(raw_message) = parsed.message else {
            return;
        };

        let latest_score = self.state.completeness_history.last().map(|r| r.score);
        let sanitized = sanitize_commit_message(&raw_message, self.state.phase, latest_score);

        let Ok(tools) = ToolRegistry::new(&self.workspace, AgentRole::Implementer, None) else {
            return;
        };

        let add_call = ToolCall {
            call_id: "commit_add".to_string(),
            tool_name: "vcs_add".to_string(),
            arguments: serde_json::json!({ "paths": parsed.files_to_add }),
        };
        tools.execute(&add_call).await;

        let commit_call = ToolCall {
            call_id: "commit_commit".to_string(),
            tool_name: "vcs_commit".to_string(),
            arguments: serde_json::json!({ "message": sanitized }),
        };
        let result = tools.execute(&commit_call).await;
        if result.success {
            self.state.commit_count += 1;
            let preview: String = sanitized.chars().take(50).collect();
            self.notify(format!("Git commit executed: {preview}..."));
        } else {
            self.notify(format!(
                "Git commit failed: {}",
                result.error.as_deref().unwrap_or("unknown error")
            ));
        }
    }

    async fn init_git(&self) {
        if self.workspace.join(".git").exists() {
            return;
        }
        for args in [
            vec!["init"],
            vec!["config", "user.email", "agentloop@local"],
            vec!["config", "user.name", "Agentloop"],
        ] {
            let _ = tokio::process::Command::new("git")
                .args(&args)
                .current_dir(&self.workspace)
                .output()
                .await;
        }
    }

    /// Drives cycles to completion, a pause, or a configured limit. Resumes
    /// from a saved snapshot if `resume` is set and one exists; otherwise
    /// starts fresh. Stops after `max_consecutive_errors` cycles in a row
    /// fail, with a short delay between retries.
    pub async fn run(&mut self, resume: bool) -> Result<(), agentloop_core::AppError> {
        if resume {
            if let Some(loaded) = LoopState::load(&self.workspace)? {
                self.state = loaded;
                self.notify("Resuming from saved state...");
            } else {
                self.state = LoopState::default();
                self.state.start_time = Some(Utc::now());
            }
        } else {
            self.state = LoopState::default();
            self.state.start_time = Some(Utc::now());
        }

        self.init_git().await;

        let max_iterations = self.config.limits.max_iterations;
        let max_runtime = Duration::from_secs(self.config.limits.max_runtime_hours * 3600);
        let mut consecutive_errors = 0u32;

        while !self.state.is_complete && !self.state.is_paused {
            if self.state.cycle_count >= max_iterations {
                tracing::info!(max_iterations, "stopping: reached max iterations");
                self.notify(format!("Reached max iterations ({max_iterations})"));
                break;
            }

            if let Some(start) = self.state.start_time {
                let elapsed = Utc::now().signed_duration_since(start);
                if elapsed.to_std().unwrap_or(Duration::ZERO) >= max_runtime {
                    tracing::info!(max_runtime_hours = self.config.limits.max_runtime_hours, "stopping: reached max runtime");
                    self.notify(format!(
                        "Reached max runtime ({}h)",
                        self.config.limits.max_runtime_hours
                    ));
                    break;
                }
            }

            let outcome = self.run_cycle().await;

            if let Some(error) = &outcome.error {
                consecutive_errors += 1;
                tracing::warn!(cycle = outcome.cycle_number, consecutive_errors, %error, "cycle errored");
                self.notify(format!("Error in cycle {}: {error}", outcome.cycle_number));
                if consecutive_errors >= MAX_CONSECUTIVE_ERRORS {
                    tracing::warn!(max_consecutive_errors = MAX_CONSECUTIVE_ERRORS, "stopping: too many consecutive errors");
                    self.notify(format!("Stopping after {MAX_CONSECUTIVE_ERRORS} consecutive errors"));
                    break;
                }
                tokio::time::sleep(ERROR_RETRY_DELAY).await;
            } else {
                consecutive_errors = 0;
            }
        }

        self.state.save(&self.workspace)?;
        Ok(())
    }

    pub fn pause(&mut self) -> Result<(), agentloop_core::AppError> {
        self.state.is_paused = true;
        self.state.save(&self.workspace)?;
        tracing::info!("loop paused");
        self.notify("Loop paused");
        Ok(())
    }

    pub fn get_status(&self) -> StatusReport {
        let elapsed = self
            .state
            .start_time
            .map(|start| Utc::now().signed_duration_since(start).to_std().unwrap_or(Duration::ZERO))
            .unwrap_or(Duration::ZERO);

        StatusReport {
            cycle_count: self.state.cycle_count,
            is_complete: self.state.is_complete,
            is_paused: self.state.is_paused,
            phase: self.state.phase,
            elapsed,
            current_score: self.state.latest_score(),
            implementer_tokens: self.state.total_implementer_usage.total,
            reviewer_tokens: self.state.total_reviewer_usage.total,
            total_tokens: self.state.total_implementer_usage.total + self.state.total_reviewer_usage.total,
        }
    }
}

#[derive(Debug, Clone)]
pub struct StatusReport {
    pub cycle_count: u32,
    pub is_complete: bool,
    pub is_paused: bool,
    pub phase: Phase,
    pub elapsed: Duration,
    pub current_score: u8,
    pub implementer_tokens: u64,
    pub reviewer_tokens: u64,
    pub total_tokens: u64,
}

fn resolve_prompt(override_path: &Option<String>, default: &'static str) -> String {
    if let Some(path) = override_path {
        let candidate = Path::new(path);
        if candidate.exists() {
            if let Ok(contents) = std::fs::read_to_string(candidate) {
                return contents;
            }
        }
    }
    default.to_string()
}
