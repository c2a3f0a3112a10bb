//! Filesystem tools: `list_files` and `read_file`.

use crate::tools::bound::bound_str;
use crate::tools::guard::PathGuard;
use crate::tools::ToolError;
use ignore::overrides::OverrideBuilder;
use ignore::WalkBuilder;
use serde::Deserialize;
use serde_json::{json, Value};

pub const MAX_FILES_DEFAULT: usize = 2000;
pub const MAX_READ_BYTES_DEFAULT: usize = 200_000;

/// Directories that are never worth showing to the model.
const PRUNED_DIRS: &[&str] = &[
    ".git",
    "node_modules",
    "target",
    "dist",
    "build",
    ".next",
    "__pycache__",
    ".venv",
    "venv",
    ".pytest_cache",
    ".mypy_cache",
];

/// How far into a file we look for a NUL byte before calling it binary.
const BINARY_SNIFF_BYTES: usize = 8 * 1024;

#[derive(Debug, Deserialize)]
pub struct ListFilesArgs {
    #[allow(dead_code)]
    pub project_id: String,
    #[serde(default)]
    pub globs: Option<Vec<String>>,
    #[serde(default)]
    pub max_files: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct ReadFileArgs {
    #[allow(dead_code)]
    pub project_id: String,
    pub path: String,
    #[serde(default)]
    pub max_bytes: Option<usize>,
}

/// Gitignore-aware listing of repository files, relative to the root.
/// Hidden files are included; the junk directories above are pruned.
pub async fn list_files(guard: &PathGuard, args: &ListFilesArgs) -> Result<Value, ToolError> {
    let max_files = args.max_files.unwrap_or(MAX_FILES_DEFAULT).max(1);
    let root = guard.root().to_path_buf();

    let mut builder = WalkBuilder::new(&root);
    builder.hidden(false).git_ignore(true).follow_links(false);

    if let Some(globs) = args.globs.as_deref().filter(|g| !g.is_empty()) {
        let mut overrides = OverrideBuilder::new(&root);
        for glob in globs {
            overrides
                .add(glob)
                .map_err(|err| ToolError::InvalidArgs(format!("bad glob '{glob}': {err}")))?;
        }
        let overrides = overrides
            .build()
            .map_err(|err| ToolError::InvalidArgs(format!("bad globs: {err}")))?;
        builder.overrides(overrides);
    }

    builder.filter_entry(|entry| {
        let name = entry.file_name().to_str().unwrap_or("");
        !PRUNED_DIRS.contains(&name)
    });

    // The walk is blocking; repo listings are small enough that running it
    // inline on the worker is fine.
    let mut files = Vec::new();
    let mut truncated = false;
    for entry in builder.build() {
        let Ok(entry) = entry else { continue };
        if !entry.file_type().is_some_and(|ft| ft.is_file()) {
            continue;
        }
        if files.len() == max_files {
            truncated = true;
            break;
        }
        let rel = entry
            .path()
            .strip_prefix(&root)
            .unwrap_or(entry.path())
            .to_string_lossy()
            .replace('\\', "/");
        files.push(rel);
    }
    files.sort();

    Ok(json!({ "files": files, "truncated": truncated }))
}

/// Read one file, bounded at `max_bytes`. Binary files (NUL byte within the
/// first 8 KiB) report size only, no content.
pub async fn read_file(guard: &PathGuard, args: &ReadFileArgs) -> Result<Value, ToolError> {
    let max_bytes = args.max_bytes.unwrap_or(MAX_READ_BYTES_DEFAULT);
    let target = guard.resolve(&args.path)?;

    let bytes = tokio::fs::read(&target)
        .await
        .map_err(|err| ToolError::Execution(format!("cannot read {}: {err}", args.path)))?;
    let total_size = bytes.len();

    let sniff = &bytes[..bytes.len().min(BINARY_SNIFF_BYTES)];
    if sniff.contains(&0) {
        return Ok(json!({ "binary": true, "total_size": total_size }));
    }

    let text = String::from_utf8(bytes)
        .map_err(|_| ToolError::Execution(format!("{} is not valid UTF-8", args.path)))?;
    let bounded = bound_str(&text, max_bytes);

    Ok(json!({
        "content": bounded.text,
        "truncated": bounded.truncated,
        "total_size": total_size,
    }))
}
