use std::path::Path;

use agentloop_orchestrator::LoopState;
use anyhow::Result;
use chrono::Utc;

pub fn print_status(workspace: &Path) -> Result<()> {
    let Some(state) = LoopState::load(workspace)? else {
        println!("no saved state in {} — nothing has run yet", workspace.display());
        return Ok(());
    };

    let elapsed = state
        .start_time
        .map(|start| Utc::now().signed_duration_since(start).num_seconds())
        .unwrap_or(0);

    println!("cycle:       {}", state.cycle_count);
    println!("phase:       {}", state.phase);
    println!("score:       {}%", state.latest_score());
    println!("complete:    {}", state.is_complete);
    println!("paused:      {}", state.is_paused);
    println!("commits:     {}", state.commit_count);
    println!("elapsed:     {elapsed}s");
    println!(
        "tokens:      {} (implementer {} / reviewer {})",
        state.total_implementer_usage.total + state.total_reviewer_usage.total,
        state.total_implementer_usage.total,
        state.total_reviewer_usage.total,
    );
    Ok(())
}

pub fn pause(workspace: &Path) -> Result<()> {
    let mut state = LoopState::load(workspace)?
        .ok_or_else(|| anyhow::anyhow!("no saved state in {} — nothing to pause", workspace.display()))?;
    state.is_paused = true;
    state.save(workspace)?;
    println!("paused");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn print_status_with_no_saved_state_does_not_error() {
        let dir = TempDir::new().unwrap();
        assert!(print_status(dir.path()).is_ok());
    }

    #[test]
    fn pause_with_no_saved_state_is_an_error() {
        let dir = TempDir::new().unwrap();
        assert!(pause(dir.path()).is_err());
    }

    #[test]
    fn pause_persists_is_paused() {
        let dir = TempDir::new().unwrap();
        LoopState::default().save(dir.path()).unwrap();
        pause(dir.path()).unwrap();
        let loaded = LoopState::load(dir.path()).unwrap().unwrap();
        assert!(loaded.is_paused);
    }
}
