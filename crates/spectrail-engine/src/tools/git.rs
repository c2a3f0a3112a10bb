//! Read-only git inspection: status, diff, and short log.
//!
//! All three shell out to fixed `git` argv lines through the process runner;
//! nothing here ever mutates the repository.

use crate::tools::bound::bound_str;
use crate::tools::guard::PathGuard;
use crate::tools::process::{run_argv, CommandOutput};
use crate::tools::ToolError;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;

pub const MAX_COMMITS_DEFAULT: usize = 10;

/// Diff payloads are clipped to 100 KiB before they reach the model.
pub const MAX_DIFF_BYTES: usize = 100 * 1024;

const GIT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Deserialize)]
pub struct GitStatusArgs {
    #[allow(dead_code)]
    pub project_id: String,
}

#[derive(Debug, Deserialize)]
pub struct GitDiffArgs {
    #[allow(dead_code)]
    pub project_id: String,
    #[serde(default)]
    pub staged: bool,
}

#[derive(Debug, Deserialize)]
pub struct GitLogArgs {
    #[allow(dead_code)]
    pub project_id: String,
    #[serde(default)]
    pub max_commits: Option<usize>,
}

async fn run_git(guard: &PathGuard, args: &[&str]) -> Result<CommandOutput, ToolError> {
    let mut argv: Vec<String> = vec!["git".into()];
    argv.extend(args.iter().map(|s| s.to_string()));
    let out = run_argv(guard.root(), &argv, GIT_TIMEOUT).await?;
    if out.timed_out {
        return Err(ToolError::Timeout);
    }
    if !out.success {
        return Err(ToolError::Execution(format!(
            "git {} failed: {}",
            args.first().copied().unwrap_or(""),
            out.stderr.trim()
        )));
    }
    Ok(out)
}

pub async fn git_status(guard: &PathGuard, _args: &GitStatusArgs) -> Result<Value, ToolError> {
    let out = run_git(guard, &["status", "--porcelain=v1", "-b"]).await?;
    Ok(json!({ "status": out.stdout }))
}

pub async fn git_diff(guard: &PathGuard, args: &GitDiffArgs) -> Result<Value, ToolError> {
    let out = if args.staged {
        run_git(guard, &["diff", "--cached"]).await?
    } else {
        run_git(guard, &["diff"]).await?
    };
    let bounded = bound_str(&out.stdout, MAX_DIFF_BYTES);
    Ok(json!({
        "diff": bounded.text,
        "truncated": bounded.truncated,
        "total_bytes": bounded.total_size,
    }))
}

pub async fn git_log_short(guard: &PathGuard, args: &GitLogArgs) -> Result<Value, ToolError> {
    let max_commits = args.max_commits.unwrap_or(MAX_COMMITS_DEFAULT).max(1);
    let count = max_commits.to_string();
    let out = run_git(guard, &["log", "--oneline", "-n", &count]).await?;
    let log: Vec<String> = out.stdout.lines().map(str::to_string).collect();
    Ok(json!({ "log": log }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::process::Command;
    use tempfile::TempDir;

    /// Initialise a repo with one commit; tests are skipped when git is absent.
    fn git_fixture() -> Option<TempDir> {
        let tmp = TempDir::new().unwrap();
        let run = |args: &[&str]| {
            Command::new("git")
                .args(args)
                .current_dir(tmp.path())
                .env("GIT_AUTHOR_NAME", "test")
                .env("GIT_AUTHOR_EMAIL", "test@example.com")
                .env("GIT_COMMITTER_NAME", "test")
                .env("GIT_COMMITTER_EMAIL", "test@example.com")
                .output()
        };
        run(&["init", "-q"]).ok()?;
        fs::write(tmp.path().join("a.txt"), "one\n").unwrap();
        run(&["add", "."]).ok()?;
        let commit = run(&["commit", "-q", "-m", "initial"]).ok()?;
        commit.status.success().then_some(tmp)
    }

    #[tokio::test]
    async fn status_reports_branch_header() {
        let Some(tmp) = git_fixture() else { return };
        let guard = PathGuard::new(tmp.path()).unwrap();
        let out = git_status(&guard, &GitStatusArgs { project_id: "p".into() })
            .await
            .unwrap();
        assert!(out["status"].as_str().unwrap().starts_with("##"));
    }

    #[tokio::test]
    async fn diff_sees_unstaged_changes_only() {
        let Some(tmp) = git_fixture() else { return };
        fs::write(tmp.path().join("a.txt"), "one\ntwo\n").unwrap();
        let guard = PathGuard::new(tmp.path()).unwrap();

        let unstaged = git_diff(
            &guard,
            &GitDiffArgs {
                project_id: "p".into(),
                staged: false,
            },
        )
        .await
        .unwrap();
        assert!(unstaged["diff"].as_str().unwrap().contains("+two"));
        assert_eq!(unstaged["truncated"], false);

        let staged = git_diff(
            &guard,
            &GitDiffArgs {
                project_id: "p".into(),
                staged: true,
            },
        )
        .await
        .unwrap();
        assert_eq!(staged["diff"].as_str().unwrap(), "");
    }

    #[tokio::test]
    async fn log_returns_oneline_entries() {
        let Some(tmp) = git_fixture() else { return };
        let guard = PathGuard::new(tmp.path()).unwrap();
        let out = git_log_short(
            &guard,
            &GitLogArgs {
                project_id: "p".into(),
                max_commits: Some(5),
            },
        )
        .await
        .unwrap();
        let log: Vec<String> = serde_json::from_value(out["log"].clone()).unwrap();
        assert_eq!(log.len(), 1);
        assert!(log[0].contains("initial"));
    }

    #[tokio::test]
    async fn non_repo_directory_reports_execution_error() {
        let tmp = TempDir::new().unwrap();
        let guard = PathGuard::new(tmp.path()).unwrap();
        let err = git_status(&guard, &GitStatusArgs { project_id: "p".into() })
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::Execution(_)));
    }
}
