//! Sandboxed repository tools exposed to the model.
//!
//! Every filesystem access goes through [`guard::PathGuard`]; every chunk of
//! repo content returned to the model passes through [`bound`]; every child
//! process runs through [`process`] with a wall-clock timeout and kill-on-drop.

pub mod bound;
pub mod fs;
pub mod git;
pub mod guard;
pub mod process;
pub mod registry;
pub mod runner;
pub mod search;

/// Tool-local failures. Everything except `RepoUnavailable` is recoverable:
/// the loop serialises it into an `{"error": "..."}` payload and continues,
/// letting the model retry with different arguments.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("unknown tool: {0}")]
    UnknownTool(String),

    #[error("invalid arguments: {0}")]
    InvalidArgs(String),

    #[error("path escapes repository root")]
    PathEscape,

    #[error("disallowed command: {0}")]
    DisallowedCommand(String),

    #[error("command timed out")]
    Timeout,

    #[error("repository unavailable: {0}")]
    RepoUnavailable(String),

    #[error("{0}")]
    Execution(String),
}

impl ToolError {
    /// Fatal errors abort the whole run instead of flowing back to the model.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ToolError::RepoUnavailable(_))
    }

    /// The `{"error": "..."}` envelope fed back to the model.
    pub fn to_payload(&self) -> serde_json::Value {
        serde_json::json!({ "error": self.to_string() })
    }
}
