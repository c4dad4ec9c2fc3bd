use std::path::Path;
use std::sync::Arc;

use agentloop_config::LoopConfig;
use agentloop_orchestrator::{Controller, Observer};
use anyhow::Result;

/// Prints one line per status change and one per completed cycle — the only
/// concession to progress reporting this non-interactive binary makes.
struct StderrObserver;

impl Observer for StderrObserver {
    fn on_status_change(&self, status: &str) {
        eprintln!("[agentloop] {status}");
    }

    fn on_cycle_complete(&self, outcome: &agentloop_orchestrator::CycleOutcome) {
        eprintln!(
            "[agentloop] cycle {} done in {:.1}s, score {}%{} (tokens: implementer {}, reviewer {})",
            outcome.cycle_number,
            outcome.duration.as_secs_f32(),
            outcome.completeness_score,
            if outcome.is_complete { " (complete)" } else { "" },
            outcome.implementer_tokens,
            outcome.reviewer_tokens,
        );
    }
}

/// The original specification is not part of `LoopState` (it never changes
/// mid-loop), so it's persisted alongside the state file rather than
/// re-threaded through every cycle's serialized snapshot.
const SPEC_FILE_NAME: &str = ".agentloop_spec.txt";

pub async fn start(workspace: &Path, spec: String, config: LoopConfig, backend: Arc<dyn agentloop_backend::Backend>) -> Result<()> {
    std::fs::write(workspace.join(SPEC_FILE_NAME), &spec)?;
    let mut controller =
        Controller::with_observer(workspace, spec, config, backend, Arc::new(StderrObserver));
    controller.run(false).await?;
    Ok(())
}

pub async fn resume(workspace: &Path, config: LoopConfig, backend: Arc<dyn agentloop_backend::Backend>) -> Result<()> {
    let spec_path = workspace.join(SPEC_FILE_NAME);
    let spec = std::fs::read_to_string(&spec_path).map_err(|_| {
        anyhow::anyhow!(
            "no saved specification at {} — run `start` before `resume`",
            spec_path.display()
        )
    })?;
    let mut controller =
        Controller::with_observer(workspace, spec, config, backend, Arc::new(StderrObserver));
    controller.run(true).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentloop_backend::mock::{text_response, MockBackend};
    use agentloop_core::ToolCall;
    use agentloop_core::TokenUsage;
    use tempfile::TempDir;

    fn submit_review_response(score: u8) -> agentloop_backend::port::GenerateResponse {
        agentloop_backend::port::GenerateResponse {
            content: String::new(),
            tool_calls: vec![ToolCall {
                call_id: "r1".to_string(),
                tool_name: "submit_review".to_string(),
                arguments: serde_json::json!({ "instructions": "keep going", "score": score }),
            }],
            usage: TokenUsage::new(1, 1),
            finish_reason: agentloop_backend::port::FinishReason::ToolCalls,
        }
    }

    #[tokio::test]
    async fn start_persists_the_spec_file_for_later_resume() {
        let dir = TempDir::new().unwrap();
        let mut config = LoopConfig::default();
        config.limits.max_iterations = 1;
        let backend = MockBackend::new(vec![
            text_response("implemented"),
            submit_review_response(10),
            text_response("ack"),
        ]);

        start(dir.path(), "Build a CLI calculator.".to_string(), config, Arc::new(backend))
            .await
            .unwrap();

        let saved = std::fs::read_to_string(dir.path().join(SPEC_FILE_NAME)).unwrap();
        assert_eq!(saved, "Build a CLI calculator.");
    }

    #[tokio::test]
    async fn resume_without_a_prior_start_is_an_error() {
        let dir = TempDir::new().unwrap();
        let backend = MockBackend::new(vec![]);
        let result = resume(dir.path(), LoopConfig::default(), Arc::new(backend)).await;
        assert!(result.is_err());
    }
}
