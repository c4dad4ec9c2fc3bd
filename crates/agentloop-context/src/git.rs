//! Recent history summaries for the Reviewer's context, shelling out to
//! `git` the way `ContextBuilder.get_git_log`/`get_last_commit` do.

use std::path::Path;
use std::time::Duration;

use tokio::process::Command;
use tokio::time::timeout;

const GIT_TIMEOUT: Duration = Duration::from_secs(10);

async fn run_git(workspace: &Path, args: &[&str]) -> Option<String> {
    let result = timeout(GIT_TIMEOUT, Command::new("git").args(args).current_dir(workspace).output()).await;
    let output = match result {
        Ok(Ok(output)) => output,
        Ok(Err(error)) => {
            tracing::debug!(?args, %error, "git command failed to spawn");
            return None;
        }
        Err(_) => {
            tracing::warn!(?args, timeout_secs = GIT_TIMEOUT.as_secs(), "git command timed out");
            return None;
        }
    };

    if output.status.success() {
        Some(String::from_utf8_lossy(&output.stdout).into_owned())
    } else {
        tracing::debug!(?args, status = %output.status, "git command exited non-zero");
        None
    }
}

/// Last `count` commits, one per line, as `<short-hash> <subject> (<relative-time>)`.
pub async fn get_git_log(workspace: &Path, count: u32) -> String {
    let n = format!("-n{count}");
    match run_git(workspace, &["log", &n, "--pretty=format:%h %s (%cr)"]).await {
        Some(log) => log,
        None => "No git history".to_string(),
    }
}

/// Hash, subject, and body of the most recent commit, or `""` if there is
/// none (e.g. a freshly initialized repository).
pub async fn get_last_commit(workspace: &Path) -> String {
    run_git(workspace, &["log", "-1", "--pretty=format:%h %s\n\n%b"])
        .await
        .map(|s| s.trim().to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn non_repo_reports_no_history() {
        let dir = TempDir::new().unwrap();
        let log = get_git_log(dir.path(), 10).await;
        assert_eq!(log, "No git history");
    }

    #[tokio::test]
    async fn non_repo_last_commit_is_empty() {
        let dir = TempDir::new().unwrap();
        let commit = get_last_commit(dir.path()).await;
        assert_eq!(commit, "");
    }

    #[tokio::test]
    async fn initialized_repo_with_commit_reports_it() {
        let dir = TempDir::new().unwrap();
        let run = |args: &[&str]| std::process::Command::new("git").args(args).current_dir(dir.path()).output();
        if run(&["init"]).is_err() {
            return; // git not available in this environment
        }
        let _ = run(&["config", "user.email", "test@example.com"]);
        let _ = run(&["config", "user.name", "test"]);
        std::fs::write(dir.path().join("a.txt"), "x").unwrap();
        let _ = run(&["add", "."]);
        let _ = run(&["commit", "-m", "initial commit"]);

        let log = get_git_log(dir.path(), 5).await;
        assert!(log.contains("initial commit"));
    }
}
