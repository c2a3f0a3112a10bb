//! Path containment for every filesystem access the tools make.
//!
//! The guard canonicalises the repo root once at construction. `resolve`
//! rejects `..` components outright, rejects absolute requests that do not
//! lie under the root, and canonicalises existing targets so a symlink whose
//! target escapes the repository is caught by the prefix check.

use crate::tools::ToolError;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct PathGuard {
    root: PathBuf,
}

impl PathGuard {
    /// Canonicalise the repo root. A root that cannot be canonicalised means
    /// the repository is gone, which is fatal for the run.
    pub fn new(repo_root: &Path) -> Result<Self, ToolError> {
        let root = repo_root.canonicalize().map_err(|err| {
            ToolError::RepoUnavailable(format!("{}: {}", repo_root.display(), err))
        })?;
        Ok(PathGuard { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a model-supplied path to an absolute path inside the root.
    pub fn resolve(&self, requested: &str) -> Result<PathBuf, ToolError> {
        // Models occasionally emit Windows separators regardless of platform.
        let normalized = requested.replace('\\', "/");
        let requested_path = Path::new(&normalized);

        if requested_path
            .components()
            .any(|c| matches!(c, std::path::Component::ParentDir))
        {
            return Err(ToolError::PathEscape);
        }

        let joined = if requested_path.is_absolute() {
            requested_path.to_path_buf()
        } else {
            self.root.join(requested_path)
        };

        match joined.canonicalize() {
            Ok(canonical) => {
                if canonical.starts_with(&self.root) {
                    Ok(canonical)
                } else {
                    Err(ToolError::PathEscape)
                }
            }
            // Target does not exist (yet): containment on the lexical join.
            Err(_) => {
                if joined.starts_with(&self.root) {
                    Ok(joined)
                } else {
                    Err(ToolError::PathEscape)
                }
            }
        }
    }
}
