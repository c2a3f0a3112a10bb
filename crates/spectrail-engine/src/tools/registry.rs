//! Tool identities, schemas, and dispatch.
//!
//! `ToolId` is the single source of truth: the schema list sent to the
//! provider and the dispatch table both derive from [`ToolId::ALL`], so they
//! cannot drift apart. Arguments are deserialised into a typed variant per
//! tool before anything executes; a failure there is `InvalidArgs`, not a
//! crash.

use crate::tools::guard::PathGuard;
use crate::tools::{fs, git, runner, search, ToolError};
use serde_json::{json, Value};
use std::path::Path;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolId {
    ListFiles,
    ReadFile,
    Grep,
    GitStatus,
    GitDiff,
    GitLogShort,
    RunCommand,
}

impl ToolId {
    pub const ALL: [ToolId; 7] = [
        ToolId::ListFiles,
        ToolId::ReadFile,
        ToolId::Grep,
        ToolId::GitStatus,
        ToolId::GitDiff,
        ToolId::GitLogShort,
        ToolId::RunCommand,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ToolId::ListFiles => "list_files",
            ToolId::ReadFile => "read_file",
            ToolId::Grep => "grep",
            ToolId::GitStatus => "git_status",
            ToolId::GitDiff => "git_diff",
            ToolId::GitLogShort => "git_log_short",
            ToolId::RunCommand => "run_command",
        }
    }

    pub fn from_name(name: &str) -> Option<ToolId> {
        ToolId::ALL.into_iter().find(|id| id.name() == name)
    }

    /// The `{"type":"function","function":{...}}` declaration sent to the
    /// provider. Every tool requires `project_id`.
    pub fn schema(self) -> Value {
        let (description, mut properties, mut required) = match self {
            ToolId::ListFiles => (
                "List files in the repository, respecting .gitignore. Returns relative paths.",
                json!({
                    "globs": {
                        "type": "array",
                        "items": { "type": "string" },
                        "description": "Optional glob patterns to filter files"
                    },
                    "max_files": {
                        "type": "integer",
                        "description": "Maximum files to return (default 2000)"
                    }
                }),
                vec![],
            ),
            ToolId::ReadFile => (
                "Read contents of a file within the repository. Large files are truncated.",
                json!({
                    "path": {
                        "type": "string",
                        "description": "Relative path to file within repo"
                    },
                    "max_bytes": {
                        "type": "integer",
                        "description": "Max bytes to read (default 200000)"
                    }
                }),
                vec!["path"],
            ),
            ToolId::Grep => (
                "Search for text patterns in repository files. Uses ripgrep if available.",
                json!({
                    "query": {
                        "type": "string",
                        "description": "Search pattern"
                    },
                    "path": {
                        "type": "string",
                        "description": "Optional subdirectory to search within"
                    },
                    "max_results": {
                        "type": "integer",
                        "description": "Max matches to return (default 200)"
                    }
                }),
                vec!["query"],
            ),
            ToolId::GitStatus => (
                "Get git status of the repository including branch info.",
                json!({}),
                vec![],
            ),
            ToolId::GitDiff => (
                "Get git diff of unstaged or staged changes.",
                json!({
                    "staged": {
                        "type": "boolean",
                        "description": "Show staged changes instead of unstaged"
                    }
                }),
                vec![],
            ),
            ToolId::GitLogShort => (
                "Get recent commit history in concise format.",
                json!({
                    "max_commits": {
                        "type": "integer",
                        "description": "Number of commits to retrieve (default 10)"
                    }
                }),
                vec![],
            ),
            ToolId::RunCommand => (
                "Run allowlisted test, lint, or build commands. Auto-detects package manager.",
                json!({
                    "kind": {
                        "type": "string",
                        "enum": ["tests", "lint", "build"],
                        "description": "Type of command to run"
                    },
                    "runner": {
                        "type": "string",
                        "enum": ["pnpm", "npm", "yarn", "cargo", "pytest"],
                        "description": "Optional explicit runner (auto-detected if not provided)"
                    }
                }),
                vec!["kind"],
            ),
        };

        properties.as_object_mut().unwrap().insert(
            "project_id".to_string(),
            json!({ "type": "string", "description": "Project ID to operate on" }),
        );
        required.insert(0, "project_id");

        json!({
            "type": "function",
            "function": {
                "name": self.name(),
                "description": description,
                "parameters": {
                    "type": "object",
                    "properties": properties,
                    "required": required,
                }
            }
        })
    }
}

/// All seven declarations, in registry order.
pub fn tool_schemas() -> Vec<Value> {
    ToolId::ALL.iter().map(|id| id.schema()).collect()
}

/// Typed arguments, one variant per tool.
#[derive(Debug)]
pub enum ToolArgs {
    ListFiles(fs::ListFilesArgs),
    ReadFile(fs::ReadFileArgs),
    Grep(search::GrepArgs),
    GitStatus(git::GitStatusArgs),
    GitDiff(git::GitDiffArgs),
    GitLogShort(git::GitLogArgs),
    RunCommand(runner::RunCommandArgs),
}

impl ToolArgs {
    pub fn parse(id: ToolId, raw: &Value) -> Result<ToolArgs, ToolError> {
        let invalid = |err: serde_json::Error| ToolError::InvalidArgs(err.to_string());
        Ok(match id {
            ToolId::ListFiles => {
                ToolArgs::ListFiles(serde_json::from_value(raw.clone()).map_err(invalid)?)
            }
            ToolId::ReadFile => {
                ToolArgs::ReadFile(serde_json::from_value(raw.clone()).map_err(invalid)?)
            }
            ToolId::Grep => ToolArgs::Grep(serde_json::from_value(raw.clone()).map_err(invalid)?),
            ToolId::GitStatus => {
                ToolArgs::GitStatus(serde_json::from_value(raw.clone()).map_err(invalid)?)
            }
            ToolId::GitDiff => {
                ToolArgs::GitDiff(serde_json::from_value(raw.clone()).map_err(invalid)?)
            }
            ToolId::GitLogShort => {
                ToolArgs::GitLogShort(serde_json::from_value(raw.clone()).map_err(invalid)?)
            }
            ToolId::RunCommand => {
                ToolArgs::RunCommand(serde_json::from_value(raw.clone()).map_err(invalid)?)
            }
        })
    }
}

/// Executes tools against one repository root. Construction canonicalises the
/// root; a repository that cannot be resolved is fatal for the run.
pub struct ToolExecutor {
    guard: PathGuard,
}

impl ToolExecutor {
    pub fn new(repo_root: &Path) -> Result<Self, ToolError> {
        Ok(ToolExecutor {
            guard: PathGuard::new(repo_root)?,
        })
    }

    pub fn guard(&self) -> &PathGuard {
        &self.guard
    }

    /// Validate and run one tool call. `raw` must be a JSON object.
    pub async fn execute(&self, name: &str, raw: &Value) -> Result<Value, ToolError> {
        let id = ToolId::from_name(name).ok_or_else(|| ToolError::UnknownTool(name.to_string()))?;
        if !raw.is_object() {
            return Err(ToolError::InvalidArgs("arguments must be an object".into()));
        }
        debug!(tool = name, "dispatching tool call");
        match ToolArgs::parse(id, raw)? {
            ToolArgs::ListFiles(args) => fs::list_files(&self.guard, &args).await,
            ToolArgs::ReadFile(args) => fs::read_file(&self.guard, &args).await,
            ToolArgs::Grep(args) => search::grep(&self.guard, &args).await,
            ToolArgs::GitStatus(args) => git::git_status(&self.guard, &args).await,
            ToolArgs::GitDiff(args) => git::git_diff(&self.guard, &args).await,
            ToolArgs::GitLogShort(args) => git::git_log_short(&self.guard, &args).await,
            ToolArgs::RunCommand(args) => runner::run_command(&self.guard, &args).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn schemas_and_dispatch_stay_in_lockstep() {
        let schemas = tool_schemas();
        assert_eq!(schemas.len(), ToolId::ALL.len());
        for (schema, id) in schemas.iter().zip(ToolId::ALL) {
            let name = schema["function"]["name"].as_str().unwrap();
            assert_eq!(name, id.name());
            assert_eq!(ToolId::from_name(name), Some(id));
        }
    }

    #[test]
    fn every_schema_requires_project_id() {
        for schema in tool_schemas() {
            let required = schema["function"]["parameters"]["required"]
                .as_array()
                .unwrap();
            assert!(
                required.iter().any(|v| v == "project_id"),
                "{} must require project_id",
                schema["function"]["name"]
            );
        }
    }

    #[test]
    fn unknown_names_do_not_resolve() {
        assert_eq!(ToolId::from_name("rm_rf"), None);
    }

    #[test]
    fn parse_rejects_missing_required_fields() {
        let err = ToolArgs::parse(ToolId::ReadFile, &json!({ "project_id": "p" })).unwrap_err();
        assert!(matches!(err, ToolError::InvalidArgs(_)));
    }

    #[test]
    fn parse_accepts_defaults_for_optional_fields() {
        let parsed = ToolArgs::parse(ToolId::GitDiff, &json!({ "project_id": "p" })).unwrap();
        match parsed {
            ToolArgs::GitDiff(args) => assert!(!args.staged),
            other => panic!("unexpected variant: {other:?}"),
        }
    }

    #[tokio::test]
    async fn executor_routes_by_name() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("a.txt"), "hi").unwrap();
        let executor = ToolExecutor::new(tmp.path()).unwrap();

        let out = executor
            .execute("list_files", &json!({ "project_id": "p" }))
            .await
            .unwrap();
        assert_eq!(out["files"][0], "a.txt");

        let err = executor
            .execute("shell", &json!({ "project_id": "p" }))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::UnknownTool(_)));
    }
}
