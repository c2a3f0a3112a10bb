//! Repository text search.
//!
//! Prefers an external ripgrep when one is on PATH; otherwise falls back to a
//! pure in-tree walker that compiles the query as a regex, degrading to a
//! case-insensitive substring scan when the pattern does not compile. Either
//! way results are `path:line:text` lines.

use crate::tools::guard::PathGuard;
use crate::tools::process::run_argv;
use crate::tools::ToolError;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use walkdir::WalkDir;

pub const MAX_RESULTS_DEFAULT: usize = 200;

const SEARCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Longest text fragment kept per match line.
const MATCH_TEXT_CAP: usize = 200;

const SKIPPED_DIRS: &[&str] = &[
    ".git",
    "node_modules",
    "target",
    "dist",
    "build",
    "__pycache__",
    ".venv",
    "venv",
];

#[derive(Debug, Deserialize)]
pub struct GrepArgs {
    #[allow(dead_code)]
    pub project_id: String,
    pub query: String,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub max_results: Option<usize>,
}

fn has_ripgrep() -> bool {
    which::which("rg").is_ok()
}

pub async fn grep(guard: &PathGuard, args: &GrepArgs) -> Result<Value, ToolError> {
    let max_results = args.max_results.unwrap_or(MAX_RESULTS_DEFAULT).max(1);

    // Validate the filter path up front so an escaping filter fails the same
    // way whichever engine runs the search.
    if let Some(filter) = args.path.as_deref() {
        guard.resolve(filter)?;
    }

    let (results, engine) = if has_ripgrep() {
        (
            grep_ripgrep(guard, &args.query, args.path.as_deref(), max_results).await?,
            "ripgrep",
        )
    } else {
        (
            grep_fallback(guard, &args.query, args.path.as_deref(), max_results).await?,
            "fallback",
        )
    };

    Ok(json!({ "results": results, "tool": engine }))
}

async fn grep_ripgrep(
    guard: &PathGuard,
    query: &str,
    path_filter: Option<&str>,
    max_results: usize,
) -> Result<Vec<String>, ToolError> {
    let mut argv: Vec<String> = vec![
        "rg".into(),
        "-n".into(),
        "--no-heading".into(),
        "--color=never".into(),
        "--max-count".into(),
        max_results.to_string(),
        "--max-columns".into(),
        MATCH_TEXT_CAP.to_string(),
    ];
    for dir in SKIPPED_DIRS {
        argv.push("-g".into());
        argv.push(format!("!{dir}"));
    }
    argv.push("--".into());
    argv.push(query.to_string());
    argv.push(path_filter.unwrap_or(".").to_string());

    let out = run_argv(guard.root(), &argv, SEARCH_TIMEOUT).await?;
    if out.timed_out {
        return Err(ToolError::Timeout);
    }
    // rg exits 1 on "no matches"; only 2+ is a real failure.
    if !out.success && out.exit_code != 1 {
        return Err(ToolError::Execution(format!(
            "ripgrep failed: {}",
            out.stderr.trim()
        )));
    }

    Ok(out
        .stdout
        .lines()
        .filter(|line| parse_match_line(line).is_some())
        .take(max_results)
        .map(|line| line.strip_prefix("./").unwrap_or(line).to_string())
        .collect())
}

/// A valid match line is `path:line:text` with a numeric line field.
fn parse_match_line(line: &str) -> Option<(&str, u32)> {
    let (path_and_line, _text) = line.split_once(':').and_then(|(path, rest)| {
        rest.split_once(':').map(|(num, text)| ((path, num), text))
    })?;
    let (path, num) = path_and_line;
    num.parse::<u32>().ok().map(|n| (path, n))
}

async fn grep_fallback(
    guard: &PathGuard,
    query: &str,
    path_filter: Option<&str>,
    max_results: usize,
) -> Result<Vec<String>, ToolError> {
    let root = guard.root().to_path_buf();
    let search_root = match path_filter {
        Some(filter) => guard.resolve(filter)?,
        None => root.clone(),
    };

    let matcher = regex::Regex::new(query).ok();
    let needle = query.to_lowercase();

    let mut results = Vec::new();
    'files: for entry in WalkDir::new(&search_root)
        .follow_links(false)
        .into_iter()
        .filter_entry(|e| {
            let name = e.file_name().to_str().unwrap_or("");
            !SKIPPED_DIRS.contains(&name)
        })
        .filter_map(|e| e.ok())
    {
        if !entry.file_type().is_file() {
            continue;
        }
        let Ok(content) = tokio::fs::read_to_string(entry.path()).await else {
            continue; // binary or unreadable
        };
        let rel = entry
            .path()
            .strip_prefix(&root)
            .unwrap_or(entry.path())
            .to_string_lossy()
            .replace('\\', "/");

        for (idx, line) in content.lines().enumerate() {
            let hit = match &matcher {
                Some(re) => re.is_match(line),
                None => line.to_lowercase().contains(&needle),
            };
            if hit {
                let text: String = line.chars().take(MATCH_TEXT_CAP).collect();
                results.push(format!("{}:{}:{}", rel, idx + 1, text));
                if results.len() >= max_results {
                    break 'files;
                }
            }
        }
    }

    Ok(results)
}
