//! Allow-listed check execution: tests, lint, build.
//!
//! The `(kind, runner)` matrix below is the entire command surface — anything
//! not in it fails with `DisallowedCommand` before a process is spawned. The
//! runner is auto-detected from lockfiles unless the caller names one.

use crate::tools::guard::PathGuard;
use crate::tools::process::{run_argv, DEFAULT_COMMAND_TIMEOUT};
use crate::tools::ToolError;
use serde::Deserialize;
use serde_json::{json, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckKind {
    Tests,
    Lint,
    Build,
}

impl CheckKind {
    pub fn as_str(self) -> &'static str {
        match self {
            CheckKind::Tests => "tests",
            CheckKind::Lint => "lint",
            CheckKind::Build => "build",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "tests" => Some(CheckKind::Tests),
            "lint" => Some(CheckKind::Lint),
            "build" => Some(CheckKind::Build),
            _ => None,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RunCommandArgs {
    #[allow(dead_code)]
    pub project_id: String,
    pub kind: String,
    #[serde(default)]
    pub runner: Option<String>,
}

/// Lockfile-based runner detection, most specific first.
pub fn detect_runner(guard: &PathGuard, explicit: Option<&str>) -> Result<String, ToolError> {
    if let Some(runner) = explicit {
        return Ok(runner.to_string());
    }
    let root = guard.root();
    let detected = if root.join("pnpm-lock.yaml").exists() {
        "pnpm"
    } else if root.join("yarn.lock").exists() {
        "yarn"
    } else if root.join("package-lock.json").exists() {
        "npm"
    } else if root.join("Cargo.toml").exists() {
        "cargo"
    } else if root.join("pyproject.toml").exists() || root.join("requirements.txt").exists() {
        "python"
    } else {
        return Err(ToolError::InvalidArgs(
            "could not detect project type; pass an explicit runner".to_string(),
        ));
    };
    Ok(detected.to_string())
}

/// The fixed argv for a `(runner, kind)` pair. This is the allow-list.
pub fn command_for(runner: &str, kind: CheckKind) -> Result<Vec<String>, ToolError> {
    let argv: &[&str] = match (runner, kind) {
        ("pnpm", CheckKind::Tests) => &["pnpm", "test"],
        ("pnpm", CheckKind::Lint) => &["pnpm", "lint"],
        ("pnpm", CheckKind::Build) => &["pnpm", "build"],

        ("npm", CheckKind::Tests) => &["npm", "test"],
        ("npm", CheckKind::Lint) => &["npm", "run", "lint"],
        ("npm", CheckKind::Build) => &["npm", "run", "build"],

        ("yarn", CheckKind::Tests) => &["yarn", "test"],
        ("yarn", CheckKind::Lint) => &["yarn", "lint"],
        ("yarn", CheckKind::Build) => &["yarn", "build"],

        ("cargo", CheckKind::Tests) => &["cargo", "test"],
        ("cargo", CheckKind::Lint) => &["cargo", "clippy", "--", "-D", "warnings"],
        ("cargo", CheckKind::Build) => &["cargo", "build"],

        ("python" | "pytest", CheckKind::Tests) => &["pytest"],
        ("python", CheckKind::Lint) => &["ruff", "check", "."],

        _ => {
            return Err(ToolError::DisallowedCommand(format!(
                "{runner} {}",
                kind.as_str()
            )))
        }
    };
    Ok(argv.iter().map(|s| s.to_string()).collect())
}

pub async fn run_command(guard: &PathGuard, args: &RunCommandArgs) -> Result<Value, ToolError> {
    let kind = CheckKind::from_str(&args.kind).ok_or_else(|| {
        ToolError::InvalidArgs(format!(
            "kind must be tests, lint, or build (got '{}')",
            args.kind
        ))
    })?;
    let runner = detect_runner(guard, args.runner.as_deref())?;
    let argv = command_for(&runner, kind)?;

    let out = run_argv(guard.root(), &argv, DEFAULT_COMMAND_TIMEOUT).await?;
    Ok(json!({
        "success": out.success,
        "exit_code": out.exit_code,
        "stdout": out.stdout,
        "stderr": out.stderr,
        "timed_out": out.timed_out,
    }))
}
